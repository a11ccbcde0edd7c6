// tests/fingerprint_priority.rs
use feed_harvester::harvest::fingerprint::fingerprint;
use feed_harvester::harvest::types::RawItem;

fn item(link: &str, guid: &str, title: &str) -> RawItem {
    RawItem {
        title: title.into(),
        link: Some(link.into()).filter(|s: &String| !s.is_empty()),
        guid: Some(guid.into()).filter(|s: &String| !s.is_empty()),
        origin: "http://feed".into(),
        ..Default::default()
    }
}

#[test]
fn link_wins_over_guid() {
    assert_eq!(fingerprint(&item("L", "G", "a")), fingerprint(&item("L", "H", "b")));
}

#[test]
fn guid_is_used_when_link_is_empty() {
    assert_eq!(fingerprint(&item("", "G", "a")), fingerprint(&item("", "G", "b")));
    assert_ne!(fingerprint(&item("", "G", "a")), fingerprint(&item("", "H", "a")));
}

#[test]
fn title_is_the_last_resort() {
    assert_eq!(fingerprint(&item("", "", "T")), fingerprint(&item("", "", "T")));
    assert_ne!(fingerprint(&item("", "", "T")), fingerprint(&item("", "", "U")));
}

#[test]
fn same_identity_value_matches_across_fields() {
    // Only the winning value is hashed, not which field it came from.
    assert_eq!(fingerprint(&item("X", "", "")), fingerprint(&item("", "X", "")));
}

#[test]
fn origin_and_content_do_not_affect_identity() {
    let mut a = item("http://a/1", "", "t");
    let mut b = item("http://a/1", "", "t");
    a.origin = "http://one".into();
    b.origin = "http://two".into();
    b.content_snippet = "different".into();
    assert_eq!(fingerprint(&a), fingerprint(&b));
}
