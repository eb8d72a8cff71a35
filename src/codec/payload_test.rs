use super::*;

#[test]
fn test_roundtrip_mixed_fields() {
    let fields = vec![
        (PropertyId(1), Value::Text("alice".to_string())),
        (PropertyId(2), Value::Int(30)),
        (PropertyId(3), Value::Real(1.5)),
        (PropertyId(4), Value::Blob(vec![9, 8, 7])),
    ];
    let bytes = encode(&fields);
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded, fields);
}

#[test]
fn test_empty_payload_decodes_to_no_fields() {
    assert_eq!(decode(&[]).unwrap(), vec![]);
}

#[test]
fn test_trailing_garbage_is_tolerated() {
    let fields = vec![(PropertyId(1), Value::Int(7))];
    let mut bytes = encode(&fields);
    bytes.push(0xff);
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded, fields);
}

#[test]
fn test_field_order_is_preserved() {
    let fields = vec![
        (PropertyId(3), Value::Int(3)),
        (PropertyId(1), Value::Int(1)),
        (PropertyId(2), Value::Int(2)),
    ];
    let decoded = decode(&encode(&fields)).unwrap();
    let ids: Vec<u16> = decoded.iter().map(|(id, _)| id.get()).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}
