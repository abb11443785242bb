use graphcheck::Reflect;

#[derive(Debug)]
struct Positive;

#[derive(Reflect)]
struct Person {
    #[rule(Positive)]
    age: i32,
    nickname: Option<String>,
    friends: Vec<Person>,
}

fn main() {
    let descriptor = Person::describe();
    assert_eq!(descriptor.members.len(), 3);
    assert!(descriptor.members[1].ty.is_nullable());
    let _ = Person {
        age: 1,
        nickname: None,
        friends: Vec::new(),
    };
}
