use super::{fallback_random, generate_guid, is_guid, Guid};

#[test]
fn generated_guids_are_valid() {
    let a = generate_guid();
    let b = generate_guid();

    assert!(is_guid(a.as_str()));
    assert!(is_guid(b.as_str()));
    assert_ne!(a, b);
    assert!(a.as_str().bytes().all(|b| !b.is_ascii_uppercase()));
}

#[test]
fn guid_ends_with_timestamp() {
    let guid = Guid::generate();
    let timestamp = u32::from_str_radix(&guid.as_str()[24..], 16).expect("hex timestamp");
    assert!(timestamp > 1_600_000_000);
}

#[test]
fn guid_validation() {
    assert!(is_guid("0123456789abcdef0123456789abcdef"));
    assert!(is_guid("0123456789ABCDEF0123456789ABCDEF"));
    assert!(!is_guid(""));
    assert!(!is_guid("0123456789abcdef0123456789abcde"));
    assert!(!is_guid("0123456789abcdef0123456789abcdef0"));
    assert!(!is_guid("0123456789abcdef0123456789abcdeg"));
    assert!(!is_guid("0123456789abcdef-123456789abcdef"));
}

#[test]
fn guid_parse() {
    let guid = Guid::parse("0123456789ABCDEF0123456789abcdef").expect("valid guid");
    assert_eq!(guid.as_str(), "0123456789abcdef0123456789abcdef");
    assert_eq!(guid.to_string(), guid.as_str());
    assert!(Guid::parse("nope").is_none());
}

#[test]
fn fallback_fills_buffer() {
    let mut a = [0u8; 12];
    let mut b = [0u8; 12];
    fallback_random(&mut a);
    fallback_random(&mut b);
    assert_ne!(a, b);
}
