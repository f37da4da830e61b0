use pillow_shop_api::dto::address::AddAddressRequest;

fn request(full_name: &str, phone: &str, street: &str, city: &str, pincode: &str) -> AddAddressRequest {
    AddAddressRequest {
        full_name: full_name.to_string(),
        phone: phone.to_string(),
        street: street.to_string(),
        city: city.to_string(),
        pincode: pincode.to_string(),
    }
}

#[test]
fn valid_address_passes() {
    let validated = request("Asha Rao", "9876543210", "12 MG Road", "Bengaluru", "560001")
        .validate()
        .expect("valid address");
    assert_eq!(validated.phone, "9876543210");
    assert_eq!(validated.pincode, "560001");
}

#[test]
fn phone_with_country_code_is_rejected() {
    // "+91 98765-43210" strips down to 12 digits, not 10.
    let errors = request(
        "Asha Rao",
        "+91 98765-43210",
        "12 MG Road",
        "Bengaluru",
        "560001",
    )
    .validate()
    .expect_err("12 digits after stripping");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "phone");
}

#[test]
fn every_violation_is_reported() {
    let errors = request("", "12345", "", "", "99")
        .validate()
        .expect_err("all fields invalid");
    let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
    assert_eq!(errors.len(), 5);
    assert!(fields.contains(&"fullName"));
    assert!(fields.contains(&"phone"));
    assert!(fields.contains(&"street"));
    assert!(fields.contains(&"city"));
    assert!(fields.contains(&"pincode"));
}

#[test]
fn phone_with_letters_is_rejected() {
    let errors = request("Asha Rao", "98765abcde", "12 MG Road", "Bengaluru", "560001")
        .validate()
        .expect_err("letters in phone");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "phone");
}

#[test]
fn pincode_with_internal_spaces_is_accepted() {
    let validated = request("Asha Rao", "(987) 654-3210", "12 MG Road", "Bengaluru", "560 001")
        .validate()
        .expect("separators stripped from phone and pincode");
    assert_eq!(validated.phone, "9876543210");
    assert_eq!(validated.pincode, "560001");
}
