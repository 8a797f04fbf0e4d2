//! Order-preserving query string handling for signing

/// Split a path or absolute URL into `(path, query)`.
///
/// Scheme, authority and fragment are discarded. A missing path becomes `/`.
pub fn split_path_and_query(input: &str) -> (&str, &str) {
    let without_fragment = input.split('#').next().unwrap_or(input);

    let path_and_query = match without_fragment.find("://") {
        Some(scheme_end) => {
            let after_scheme = &without_fragment[scheme_end + 3..];
            match after_scheme.find(['/', '?']) {
                Some(idx) => &after_scheme[idx..],
                None => "",
            }
        }
        None => without_fragment,
    };

    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, query),
        None => (path_and_query, ""),
    };

    if path.is_empty() {
        ("/", query)
    } else {
        (path, query)
    }
}

/// Raw `key=value` query segments in their original order.
///
/// Values are kept exactly as they appeared on the wire; keys are compared
/// after percent-decoding so `%73` and `s` name the same parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    /// Parse a raw query string (without the leading `?`)
    pub fn parse(query: &str) -> Self {
        let pairs = query
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (segment.to_string(), String::new()),
            })
            .collect();
        Self { pairs }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// First raw value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key_matches(key, name))
            .map(|(_, value)| value.as_str())
    }

    /// First value for `name`, percent-decoded (`+` is treated as space)
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_component)
    }

    /// Replace the first occurrence of `name` in place and drop the rest,
    /// or append when absent
    pub fn set(&mut self, name: &str, value: &str) {
        match self.pairs.iter().position(|(key, _)| key_matches(key, name)) {
            Some(first) => {
                self.pairs[first].1 = value.to_string();
                let mut index = 0;
                self.pairs.retain(|(key, _)| {
                    let keep = index <= first || !key_matches(key, name);
                    index += 1;
                    keep
                });
            }
            None => self.append(name, value),
        }
    }

    pub fn append(&mut self, name: &str, value: &str) {
        self.pairs.push((name.to_string(), value.to_string()));
    }

    /// Remove every occurrence of `name`
    pub fn remove(&mut self, name: &str) {
        self.pairs.retain(|(key, _)| !key_matches(key, name));
    }

    /// Serialize back into `k=v&k=v` form, preserving order
    pub fn serialize(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn key_matches(raw_key: &str, name: &str) -> bool {
    raw_key == name || decode_component(raw_key) == name
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}
