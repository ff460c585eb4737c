use super::{Signature, SignatureError};

#[test]
fn basic_signatures() {
    assert!(Signature::new(b"").is_ok());
    assert!(Signature::new(b"s").is_ok());
    assert!(Signature::new(b"o").is_ok());
    assert!(Signature::new(b"g").is_ok());
    assert!(Signature::new(b"u").is_ok());
    assert!(Signature::new(b"sus").is_ok());
}

#[test]
fn unknown_type_code() {
    assert_eq!(
        Signature::new(b"a"),
        Err(SignatureError::UnknownTypeCode(b'a'))
    );
    assert_eq!(
        Signature::new(b"s\0"),
        Err(SignatureError::UnknownTypeCode(0))
    );
}

#[test]
fn too_long() {
    let long = vec![b's'; Signature::MAX + 1];
    assert_eq!(Signature::new(&long[..]), Err(SignatureError::SignatureTooLong));

    let max = vec![b's'; Signature::MAX];
    assert!(Signature::new(&max[..]).is_ok());
}

#[test]
fn constants_match_type_codes() {
    assert_eq!(Signature::STRING.as_bytes(), b"s");
    assert_eq!(Signature::OBJECT_PATH.as_bytes(), b"o");
    assert_eq!(Signature::SIGNATURE.as_bytes(), b"g");
    assert_eq!(Signature::UINT32.as_bytes(), b"u");
}
