use graphcheck::Reflect;

#[derive(Debug)]
struct Limit(u32);

#[derive(Reflect)]
#[rule(Limit(3), Limit(4))]
struct Page<T>
where
    T: Clone,
{
    #[rule(Limit(10))]
    items: Vec<T>,
    next: Option<Box<Page<T>>>,
}

fn main() {
    let descriptor = <Page<u16>>::describe();
    assert_eq!(descriptor.attributes.len(), 2);
    assert_eq!(descriptor.members.len(), 2);
    let page = Page::<u16> {
        items: vec![1],
        next: None,
    };
    assert!(descriptor.members[1].read(&page).is_none());
}
