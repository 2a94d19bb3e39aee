//! Header translation between envelope maps and the ordered header list.

use crate::http::HeaderList;
use std::collections::HashMap;

/// V1 request headers: every pair is appended as-is.
pub fn from_v1(headers: &HashMap<String, String>) -> HeaderList {
    headers.iter().map(|(n, v)| (n.clone(), v.clone())).collect()
}

/// V2 request headers.
///
/// V2 moves cookies out of the headers into their own list. A non-empty list
/// is folded back into one `Cookie` header joined with `"; "`.
pub fn from_v2(headers: &HashMap<String, String>, cookies: Option<&[String]>) -> HeaderList {
    let mut list = from_v1(headers);
    if let Some(cookies) = cookies.filter(|c| !c.is_empty()) {
        list.append("Cookie", cookies.join("; "));
    }
    list
}

/// V1 response headers: values grouped per name, insertion order kept.
pub fn to_multi_value(headers: &HeaderList) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers.iter() {
        map.entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }
    map
}

/// V2 response headers: repeated names joined with `","` in encounter order.
///
/// Values that themselves contain commas are not escaped.
pub fn to_joined(headers: &HeaderList) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers.iter() {
        map.entry(name.to_string())
            .and_modify(|current| {
                current.push(',');
                current.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}
