//! Query-string normalisation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::SortDirection;

/// Keys every listing understands.
pub const FIXED_KEYS: &[&str] = &["q", "status", "sort", "dir", "page", "from", "to"];

/// Canonical list parameters.
///
/// All values are trimmed. `dir` is `None` when the caller gave none; any
/// other value outside `asc`/`desc` coerces to `asc`. A missing page reads
/// as `"1"`; the paginator deals with garbage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrudParams {
    pub q: String,
    pub status: String,
    pub sort: String,
    pub dir: Option<SortDirection>,
    pub page: String,
    #[serde(rename = "from")]
    pub date_from: String,
    #[serde(rename = "to")]
    pub date_to: String,
    /// Descriptor-declared filter keys outside [`FIXED_KEYS`], in declaration order.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for CrudParams {
    fn default() -> Self {
        Self {
            q: String::new(),
            status: String::new(),
            sort: String::new(),
            dir: None,
            page: "1".to_string(),
            date_from: String::new(),
            date_to: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl CrudParams {
    /// Parse raw pairs. Repeated keys keep the last value; keys that are
    /// neither fixed nor listed in `extra_keys` are ignored.
    pub fn parse<'a, I>(raw: I, extra_keys: &[&str]) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        let mut page: Option<String> = None;

        for (key, value) in raw {
            let value = value.trim();
            match key {
                "q" => params.q = value.to_string(),
                "status" => params.status = value.to_string(),
                "sort" => params.sort = value.to_string(),
                "dir" => {
                    params.dir = if value.is_empty() {
                        None
                    } else {
                        Some(SortDirection::parse(value).unwrap_or(SortDirection::Asc))
                    }
                }
                "page" => page = Some(value.to_string()),
                "from" => params.date_from = value.to_string(),
                "to" => params.date_to = value.to_string(),
                other if extra_keys.contains(&other) => {
                    params.extra.insert(other.to_string(), value.to_string());
                }
                _ => {}
            }
        }

        params.page = match page {
            Some(p) if !p.is_empty() => p,
            _ => "1".to_string(),
        };
        params
    }

    /// Raw value for a filter name (fixed or declared extra key).
    pub fn value_for(&self, name: &str) -> &str {
        match name {
            "q" => &self.q,
            "status" => &self.status,
            "sort" => &self.sort,
            "dir" => self.dir.map(SortDirection::as_str).unwrap_or_default(),
            "page" => &self.page,
            "from" => &self.date_from,
            "to" => &self.date_to,
            other => self.extra.get(other).map(String::as_str).unwrap_or_default(),
        }
    }

    /// Effective direction: the explicit `dir`, ascending when none was given.
    pub fn direction(&self) -> SortDirection {
        self.dir.unwrap_or(SortDirection::Asc)
    }

    fn pairs(&self, include_page: bool) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = vec![
            ("q", self.q.as_str()),
            ("status", self.status.as_str()),
            ("sort", self.sort.as_str()),
            ("dir", self.dir.map(SortDirection::as_str).unwrap_or_default()),
        ];
        if include_page {
            pairs.push(("page", self.page.as_str()));
        }
        pairs.push(("from", self.date_from.as_str()));
        pairs.push(("to", self.date_to.as_str()));
        pairs.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        pairs
            .into_iter()
            .filter(|(_, v)| !is_blank_or_all(v))
            .collect()
    }

    /// Current state minus `page`, for pagination and sort links.
    pub fn query_string_without_page(&self) -> String {
        encode(&self.pairs(false))
    }

    /// Current state including `page`, appended to row action URLs.
    pub fn query_string(&self) -> String {
        encode(&self.pairs(true))
    }

    /// Non-empty filter state, for echoing back to clients.
    pub fn current_filters(&self) -> BTreeMap<String, String> {
        self.pairs(true)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Blank and `all` mean "no filter".
pub fn is_blank_or_all(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "all"
}

fn encode(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[(&str, &str)]) -> CrudParams {
        CrudParams::parse(raw.iter().copied(), &["role"])
    }

    #[test]
    fn values_are_trimmed_and_page_defaults_to_one() {
        let p = parse(&[("q", "  widget "), ("status", " active")]);
        assert_eq!(p.q, "widget");
        assert_eq!(p.status, "active");
        assert_eq!(p.page, "1");
        assert_eq!(p.dir, None);
    }

    #[test]
    fn invalid_direction_coerces_to_asc() {
        assert_eq!(parse(&[("dir", "sideways")]).dir, Some(SortDirection::Asc));
        assert_eq!(parse(&[("dir", "DESC")]).dir, Some(SortDirection::Desc));
        assert_eq!(parse(&[("dir", "  ")]).dir, None);
    }

    #[test]
    fn missing_or_blank_direction_is_ascending() {
        assert_eq!(parse(&[]).direction(), SortDirection::Asc);
        assert_eq!(parse(&[("dir", "")]).direction(), SortDirection::Asc);
        assert_eq!(parse(&[("sort", "name")]).direction(), SortDirection::Asc);
        assert_eq!(
            parse(&[("sort", "name"), ("dir", "desc")]).direction(),
            SortDirection::Desc
        );
    }

    #[test]
    fn blank_and_all_values_are_dropped_from_query_string() {
        let p = parse(&[
            ("q", "a b"),
            ("status", "all"),
            ("sort", ""),
            ("page", "3"),
            ("role", "staff"),
        ]);
        assert_eq!(p.query_string_without_page(), "q=a%20b&role=staff");
        assert_eq!(p.query_string(), "q=a%20b&page=3&role=staff");
    }

    #[test]
    fn undeclared_keys_are_ignored() {
        let p = parse(&[("evil", "1"), ("role", "regular")]);
        assert_eq!(p.value_for("evil"), "");
        assert_eq!(p.value_for("role"), "regular");
    }

    #[test]
    fn last_repeated_key_wins() {
        let p = parse(&[("q", "first"), ("q", "second")]);
        assert_eq!(p.q, "second");
    }
}
