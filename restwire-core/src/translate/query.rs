//! # Query String Encoding
//!
//! Flattens a `serde_json::Value` into `application/x-www-form-urlencoded` entries.
//!
//! * Objects become `prefix.field` entries (or `field` when there is no prefix), skipping
//!   `null` fields.
//! * Arrays become `prefix[index]` entries (or bare values when there is no prefix).
//! * Scalars become `prefix=value` (or `value` when there is no prefix).
//!
//! Field names and values are form-encoded (a space becomes `+`). The top-level prefix comes
//! from the contract and is emitted as-is.
use serde_json::Value;
use url::form_urlencoded::byte_serialize;

/// Encodes `value` as a query fragment, using `prefix` as the name of the top-level value.
///
/// Returns an empty string for `null`, or for composites whose entries are all `null`.
pub fn encode(value: &Value, prefix: &str) -> String {
    let mut entries = Vec::new();
    flatten(value, prefix, &mut entries);
    entries.join("&")
}

/// Same as [`encode`] but returns the individual entries.
pub fn encode_entries(value: &Value, prefix: &str) -> Vec<String> {
    let mut entries = Vec::new();
    flatten(value, prefix, &mut entries);
    entries
}

fn flatten(value: &Value, prefix: &str, entries: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let name = if prefix.is_empty() {
                    String::new()
                } else {
                    format!("{prefix}[{index}]")
                };
                flatten(item, &name, entries);
            }
        }
        Value::Object(fields) => {
            for (field, item) in fields {
                let field = encode_component(field);
                let name = if prefix.is_empty() {
                    field
                } else {
                    format!("{prefix}.{field}")
                };
                flatten(item, &name, entries);
            }
        }
        scalar => {
            let encoded = encode_component(&scalar_to_string(scalar));
            if prefix.is_empty() {
                entries.push(encoded);
            } else {
                entries.push(format!("{prefix}={encoded}"));
            }
        }
    }
}

/// Form-encodes a single query component.
pub fn encode_component(input: &str) -> String {
    byte_serialize(input.as_bytes()).collect()
}

/// Percent-encodes a value so it travels as exactly one path segment.
///
/// Reserved characters such as `/`, `?`, `#` and `:` are escaped and spaces become `%20`.
/// The dot segments `.` and `..` have no escaped form and must be rejected by the caller.
pub fn encode_segment(input: &str) -> String {
    // Literal `+` is already escaped as `%2B`, so every remaining `+` was a space.
    encode_component(input).replace('+', "%20")
}

/// The plain string form of a value, as used in routes, headers and key/value query entries.
///
/// Strings are returned verbatim, `null` becomes an empty string and composites are rendered
/// as compact JSON.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        composite => composite.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_encodes_to_nothing() {
        assert_eq!(encode(&Value::Null, ""), "");
        assert_eq!(encode(&Value::Null, "test"), "");
    }

    #[test]
    fn scalars_with_and_without_prefix() {
        assert_eq!(encode(&json!("MyValue"), ""), "MyValue");
        assert_eq!(encode(&json!("MyValue"), "test"), "test=MyValue");
        assert_eq!(encode(&json!(15), ""), "15");
        assert_eq!(encode(&json!(15), "test"), "test=15");
        assert_eq!(
            encode(&json!("2022-08-11T10:45:26.0700000Z"), "test"),
            "test=2022-08-11T10%3A45%3A26.0700000Z"
        );
    }

    #[test]
    fn lists_flatten_recursively() {
        let list = json!([15, "MyValue", [1, 2]]);

        assert_eq!(encode(&list, ""), "15&MyValue&1&2");
        assert_eq!(
            encode(&list, "test"),
            "test[0]=15&test[1]=MyValue&test[2][0]=1&test[2][1]=2"
        );
    }

    #[test]
    fn objects_flatten_in_declaration_order_and_skip_nulls() {
        let object = json!({
            "Id": 12,
            "Name": "My Name",
            "Number": null,
            "Status": true,
            "List": [
                { "Value": 1, "Name": "Item 1", "Description": null, "HttpStatus": "Accepted" },
                { "Value": 2, "Name": "Item 2", "Description": "Description 2", "HttpStatus": "Accepted" }
            ]
        });

        assert_eq!(
            encode(&object, ""),
            "Id=12&Name=My+Name&Status=true&List[0].Value=1&List[0].Name=Item+1&List[0].HttpStatus=Accepted\
             &List[1].Value=2&List[1].Name=Item+2&List[1].Description=Description+2&List[1].HttpStatus=Accepted"
        );
    }

    #[test]
    fn nested_objects_use_dotted_names() {
        let object = json!({ "parent": { "id": 10, "name": "a&b" } });

        assert_eq!(
            encode(&object, "filter"),
            "filter.parent.id=10&filter.parent.name=a%26b"
        );
    }

    #[test]
    fn field_names_are_encoded_too() {
        let object = json!({ "a&b": 1, "c=d": 2, "my key": "x y", "Value": 21 });

        assert_eq!(encode(&object, ""), "a%26b=1&c%3Dd=2&my+key=x+y&Value=21");
        assert_eq!(encode(&object, "f"), "f.a%26b=1&f.c%3Dd=2&f.my+key=x+y&f.Value=21");
    }

    #[test]
    fn path_segments_keep_their_literal_value() {
        assert_eq!(encode_segment("Nome"), "Nome");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("a?b#c"), "a%3Fb%23c");
        assert_eq!(encode_segment("http://evil.test/steal"), "http%3A%2F%2Fevil.test%2Fsteal");
        assert_eq!(encode_segment("user:1"), "user%3A1");
        assert_eq!(encode_segment("a b+c"), "a%20b%2Bc");
        assert_eq!(encode_segment("MyIRAFVEd2aImaq7zN3u-w"), "MyIRAFVEd2aImaq7zN3u-w");
    }

    #[test]
    fn plain_string_forms() {
        assert_eq!(scalar_to_string(&json!("Nome")), "Nome");
        assert_eq!(scalar_to_string(&json!(21)), "21");
        assert_eq!(scalar_to_string(&json!(false)), "false");
        assert_eq!(scalar_to_string(&Value::Null), "");
        assert_eq!(scalar_to_string(&json!([1, 2])), "[1,2]");
    }
}
