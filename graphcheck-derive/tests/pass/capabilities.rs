use graphcheck::{DataErrorInfo, Origin, Reflect, ValidatableObject, ValidationResult};

#[derive(Reflect)]
#[reflect(validatable, error_info)]
struct Form {
    value: u8,
}

impl ValidatableObject for Form {
    fn validate(&self) -> Vec<ValidationResult> {
        Vec::new()
    }
}

impl DataErrorInfo for Form {
    fn error(&self) -> Option<String> {
        None
    }
}

#[derive(Reflect)]
#[reflect(external)]
struct Foreign;

fn main() {
    let ty = Form::type_ref();
    assert!(ty.capabilities().is_validatable());
    assert!(ty.capabilities().has_error_info());
    assert_eq!(Foreign::type_ref().origin(), Origin::External);
    let _ = Form { value: 0 }.value;
}
