use datactx_fs::{NormalizedPath, validate_path_segment};
use rstest::rstest;

#[rstest]
#[case("foo/bar/baz", "foo/bar/baz")]
#[case("foo\\bar\\baz", "foo/bar/baz")]
#[case("foo/bar\\baz", "foo/bar/baz")]
fn test_normalizes_separators(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(NormalizedPath::new(input).as_str(), expected);
}

#[test]
fn test_join_paths() {
    let base = NormalizedPath::new("foo/bar");
    assert_eq!(base.join("baz").as_str(), "foo/bar/baz");
    assert_eq!(NormalizedPath::new("foo/").join("baz").as_str(), "foo/baz");
}

#[test]
fn test_parent_and_file_name() {
    let path = NormalizedPath::new("/root/project/datactx.yml");
    assert_eq!(path.file_name(), Some("datactx.yml"));
    assert_eq!(path.extension(), Some("yml"));
    assert_eq!(path.parent().unwrap().as_str(), "/root/project");
}

#[test]
fn test_hidden_file_has_no_extension() {
    let path = NormalizedPath::new("base/.datactx_store_backend_id");
    assert_eq!(path.extension(), None);
}

#[rstest]
#[case("suite", true)]
#[case("suite.v2", true)]
#[case("..", false)]
#[case(".", false)]
#[case("a/b", false)]
#[case("a\\b", false)]
#[case("", false)]
fn test_validate_path_segment(#[case] segment: &str, #[case] ok: bool) {
    assert_eq!(validate_path_segment(segment).is_ok(), ok);
}

#[test]
fn test_canonicalize_existing_dir() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path()).join("sub");
    std::fs::create_dir(path.to_native()).unwrap();

    let canonical = path.canonicalize().unwrap();
    assert!(canonical.is_dir());
    assert!(canonical.as_str().ends_with("/sub"));
}
