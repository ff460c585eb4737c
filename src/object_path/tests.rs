use super::ObjectPath;

#[test]
fn valid_paths() {
    assert!(ObjectPath::new(b"/").is_ok());
    assert!(ObjectPath::new(b"/org").is_ok());
    assert!(ObjectPath::new(b"/org/freedesktop/DBus").is_ok());
    assert!(ObjectPath::new(b"/a_b/c0").is_ok());
}

#[test]
fn invalid_paths() {
    assert!(ObjectPath::new(b"").is_err());
    assert!(ObjectPath::new(b"org").is_err());
    assert!(ObjectPath::new(b"/org/").is_err());
    assert!(ObjectPath::new(b"//org").is_err());
    assert!(ObjectPath::new(b"/org//freedesktop").is_err());
    assert!(ObjectPath::new(b"/org/free-desktop").is_err());
    assert!(ObjectPath::new(b"/org/free desktop").is_err());
}

#[test]
fn root_is_special() {
    assert_eq!(ObjectPath::ROOT.as_str(), "/");
    assert_eq!(ObjectPath::ROOT, ObjectPath::new("/").unwrap());
}
