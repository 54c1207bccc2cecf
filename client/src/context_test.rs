use super::*;

fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

#[test]
fn from_attributes_reads_all_three() {
    let ctx = ClientContext::from_attributes(&attrs(&[
        (ATTR_TABLE_ID, " 7 "),
        (ATTR_USER_ID, "u-1"),
        (ATTR_NICKNAME, "Ann"),
    ]))
    .expect("context should parse");

    assert_eq!(ctx, ClientContext::new("7", "u-1", "Ann"));
}

#[test]
fn from_attributes_requires_every_attribute() {
    assert!(ClientContext::from_attributes(&attrs(&[(ATTR_TABLE_ID, "7"), (ATTR_USER_ID, "u-1")])).is_none());
    assert!(
        ClientContext::from_attributes(&attrs(&[(ATTR_TABLE_ID, "7"), (ATTR_USER_ID, "u-1"), (ATTR_NICKNAME, "  ")]))
            .is_none()
    );
}
