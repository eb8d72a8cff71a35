use super::*;

#[test]
fn test_empty_filter_allows_everything() {
    let f = ClassFilter::new();
    assert!(f.allows(ClassId(1)));
    assert!(f.allows(ClassId(99)));
}

#[test]
fn test_only_restricts_to_named_classes() {
    let f = ClassFilter::new().only([ClassId(1), ClassId(2)]);
    assert!(f.allows(ClassId(1)));
    assert!(f.allows(ClassId(2)));
    assert!(!f.allows(ClassId(3)));
}

#[test]
fn test_exclude_overrides_only() {
    let f = ClassFilter::new().only([ClassId(1), ClassId(2)]).exclude([ClassId(2)]);
    assert!(f.allows(ClassId(1)));
    assert!(!f.allows(ClassId(2)));
}

#[test]
fn test_exclude_without_only() {
    let f = ClassFilter::new().exclude([ClassId(5)]);
    assert!(f.allows(ClassId(1)));
    assert!(!f.allows(ClassId(5)));
}
