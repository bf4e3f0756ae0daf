//! The info-request schema.
//!
//! An info request names the fields to extract. Every key is a
//! [`FieldKey`] and every value has the shape the key prescribes: a flag, a
//! list of labels or a choice-set. Validation collects every problem it
//! finds instead of stopping at the first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{codes, RequestValidationError, ValidationIssue};

/// Platforms listed in the request template's choice-sets.
pub const TEMPLATE_PLATFORMS: [&str; 8] = [
    "facebook",
    "twitter",
    "instagram",
    "linkedin",
    "youtube",
    "pinterest",
    "tumblr",
    "snapchat",
];

/// Pages listed in the request template's `pages_url`.
pub const TEMPLATE_PAGES: [&str; 5] = ["about", "contact", "careers", "services", "products"];

/// A field that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    /// Display name of the site.
    Name,
    /// Logo and icon URLs.
    Logos,
    /// Postal addresses.
    Address,
    /// Social-media profile per platform.
    SiteSocials,
    /// All social-media links per platform.
    SocialMediaLinks,
    /// Phone numbers.
    AllPhoneNumbers,
    /// Email addresses.
    AllEmails,
    /// Links.
    AllLinks,
    /// Guessed sub-page URLs per label.
    PagesUrl,
}

/// The value shape a request key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// `true` or `false`.
    Flag,
    /// A list of strings.
    List,
    /// `{"all": bool, "choices": [string]}`.
    ChoiceSet,
}

/// The value shape a result key produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// An optional string.
    Single,
    /// A list of strings.
    List,
    /// A one-level mapping.
    Map,
}

impl FieldKey {
    /// Every key, in template order.
    pub const ALL: [Self; 9] = [
        Self::Name,
        Self::Logos,
        Self::Address,
        Self::SiteSocials,
        Self::SocialMediaLinks,
        Self::AllPhoneNumbers,
        Self::AllEmails,
        Self::AllLinks,
        Self::PagesUrl,
    ];

    /// The wire name of the key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Logos => "logos",
            Self::Address => "address",
            Self::SiteSocials => "site_socials",
            Self::SocialMediaLinks => "social_media_links",
            Self::AllPhoneNumbers => "all_phone_numbers",
            Self::AllEmails => "all_emails",
            Self::AllLinks => "all_links",
            Self::PagesUrl => "pages_url",
        }
    }

    /// The request shape this key accepts.
    #[must_use]
    pub const fn shape(self) -> RequestShape {
        match self {
            Self::SiteSocials | Self::SocialMediaLinks => RequestShape::ChoiceSet,
            Self::PagesUrl => RequestShape::List,
            _ => RequestShape::Flag,
        }
    }

    /// The result shape this key produces.
    #[must_use]
    pub const fn result_kind(self) -> ResultKind {
        match self {
            Self::Name => ResultKind::Single,
            Self::SiteSocials | Self::SocialMediaLinks | Self::PagesUrl => ResultKind::Map,
            Self::Logos
            | Self::Address
            | Self::AllPhoneNumbers
            | Self::AllEmails
            | Self::AllLinks => ResultKind::List,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown field key `{s}`"))
    }
}

/// A choice-set value: search everything, or only the listed choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSet {
    /// Search the full default list.
    #[serde(default)]
    pub all: bool,
    /// The subset to search when `all` is false.
    #[serde(default)]
    pub choices: Vec<String>,
}

/// The requested value for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRequest {
    /// A boolean flag.
    Flag(bool),
    /// A list of labels.
    List(Vec<String>),
    /// A choice-set.
    Choices(ChoiceSet),
}

/// How a requested key is to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Resolve the key with no arguments.
    Flag,
    /// Resolve each label in the list.
    List(Vec<String>),
    /// Resolve every item of the default list.
    All,
    /// Resolve only the given items.
    Subset(Vec<String>),
}

impl FieldRequest {
    /// The shape of this value.
    #[must_use]
    pub const fn shape(&self) -> RequestShape {
        match self {
            Self::Flag(_) => RequestShape::Flag,
            Self::List(_) => RequestShape::List,
            Self::Choices(_) => RequestShape::ChoiceSet,
        }
    }

    /// Decides how the value is resolved, or `None` to skip the key.
    ///
    /// `false`, an empty list and a choice-set with `all: false` and no
    /// choices are all skipped. Blank labels are dropped; choices are
    /// lowercased and deduplicated.
    #[must_use]
    pub fn invocation(&self) -> Option<Invocation> {
        match self {
            Self::Flag(true) => Some(Invocation::Flag),
            Self::Flag(false) => None,
            Self::List(labels) => {
                let labels = normalized(labels, false);
                (!labels.is_empty()).then_some(Invocation::List(labels))
            }
            Self::Choices(set) if set.all => Some(Invocation::All),
            Self::Choices(set) => {
                let choices = normalized(&set.choices, true);
                (!choices.is_empty()).then_some(Invocation::Subset(choices))
            }
        }
    }
}

fn normalized(items: &[String], lowercase: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let item = if lowercase {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        };
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// A validated info request.
///
/// Build one with [`from_value`](Self::from_value) or
/// [`insert`](Self::insert); both check every value against its key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InfoRequestSpec {
    fields: BTreeMap<FieldKey, FieldRequest>,
}

impl InfoRequestSpec {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical template: every key, requesting everything.
    #[must_use]
    pub fn template() -> Self {
        let choices = ChoiceSet {
            all: true,
            choices: TEMPLATE_PLATFORMS.iter().map(|p| (*p).to_string()).collect(),
        };
        let fields = FieldKey::ALL
            .into_iter()
            .map(|key| {
                let request = match key.shape() {
                    RequestShape::Flag => FieldRequest::Flag(true),
                    RequestShape::List => FieldRequest::List(
                        TEMPLATE_PAGES.iter().map(|p| (*p).to_string()).collect(),
                    ),
                    RequestShape::ChoiceSet => FieldRequest::Choices(choices.clone()),
                };
                (key, request)
            })
            .collect();
        Self { fields }
    }

    /// Validates a JSON value as an info request.
    ///
    /// `field_name` prefixes issue paths (e.g. `info_request.foo`).
    ///
    /// # Errors
    ///
    /// Returns every unknown key, unknown choice-set sub-key and mistyped
    /// value found.
    pub fn from_value(value: &Value, field_name: &str) -> Result<Self, RequestValidationError> {
        let Some(object) = value.as_object() else {
            return Err(RequestValidationError::single(
                ValidationIssue::new(
                    field_name,
                    codes::NOT_OBJECT,
                    format!("`{field_name}` must be an object"),
                )
                .with_context_entry("type", json_type(value)),
            ));
        };

        let mut errors = RequestValidationError::new();
        let mut fields = BTreeMap::new();

        for (name, raw) in object {
            let path = format!("{field_name}.{name}");
            let Ok(key) = name.parse::<FieldKey>() else {
                errors.push(
                    ValidationIssue::new(
                        path,
                        codes::UNKNOWN_KEY,
                        format!("Invalid key `{name}` in `{field_name}`"),
                    )
                    .with_fix_hint(allowed_keys_hint())
                    .with_context_entry("key", name.as_str()),
                );
                continue;
            };

            match parse_field(key, raw, &path) {
                Ok(request) => {
                    fields.insert(key, request);
                }
                Err(e) => errors.merge(e),
            }
        }

        errors.into_result(Self { fields })
    }

    /// Adds or replaces a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the value's shape does not fit the key.
    pub fn insert(
        &mut self,
        key: FieldKey,
        request: FieldRequest,
    ) -> Result<(), RequestValidationError> {
        if request.shape() != key.shape() {
            return Err(RequestValidationError::single(wrong_type(key, key.as_str())));
        }
        self.fields.insert(key, request);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Returns an error if the value's shape does not fit the key.
    pub fn with(
        mut self,
        key: FieldKey,
        request: FieldRequest,
    ) -> Result<Self, RequestValidationError> {
        self.insert(key, request)?;
        Ok(self)
    }

    /// Gets the requested value for a key.
    #[must_use]
    pub fn get(&self, key: FieldKey) -> Option<&FieldRequest> {
        self.fields.get(&key)
    }

    /// Iterates over keys and values in template order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &FieldRequest)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Keys that will actually be resolved, with their invocation.
    #[must_use]
    pub fn invocations(&self) -> Vec<(FieldKey, Invocation)> {
        self.iter()
            .filter_map(|(key, request)| request.invocation().map(|inv| (key, inv)))
            .collect()
    }

    /// Number of keys present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains(&self, key: FieldKey) -> bool {
        self.fields.contains_key(&key)
    }
}

fn parse_field(
    key: FieldKey,
    raw: &Value,
    path: &str,
) -> Result<FieldRequest, RequestValidationError> {
    let parsed = match key.shape() {
        RequestShape::Flag => raw.as_bool().map(FieldRequest::Flag),
        RequestShape::List => string_list(raw).map(FieldRequest::List),
        RequestShape::ChoiceSet => {
            return parse_choice_set(key, raw, path).map(FieldRequest::Choices)
        }
    };

    parsed.ok_or_else(|| {
        RequestValidationError::single(
            wrong_type(key, path).with_context_entry("type", json_type(raw)),
        )
    })
}

fn parse_choice_set(
    key: FieldKey,
    raw: &Value,
    path: &str,
) -> Result<ChoiceSet, RequestValidationError> {
    let Some(object) = raw.as_object() else {
        return Err(RequestValidationError::single(
            wrong_type(key, path).with_context_entry("type", json_type(raw)),
        ));
    };

    let mut errors = RequestValidationError::new();
    let mut set = ChoiceSet::default();

    for (sub, value) in object {
        let sub_path = format!("{path}.{sub}");
        match sub.as_str() {
            "all" => match value.as_bool() {
                Some(all) => set.all = all,
                None => errors.push(ValidationIssue::new(
                    sub_path.as_str(),
                    codes::WRONG_TYPE,
                    format!("`{sub_path}` must be a boolean"),
                )),
            },
            "choices" => match string_list(value) {
                Some(choices) => set.choices = choices,
                None => errors.push(ValidationIssue::new(
                    sub_path.as_str(),
                    codes::WRONG_TYPE,
                    format!("`{sub_path}` must be a list of strings"),
                )),
            },
            _ => errors.push(
                ValidationIssue::new(
                    sub_path.as_str(),
                    codes::UNKNOWN_SUBKEY,
                    format!("Invalid key `{sub}` in `{path}`"),
                )
                .with_context_entry("key", sub.as_str()),
            ),
        }
    }

    errors.into_result(set)
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn allowed_keys_hint() -> String {
    let keys: Vec<&str> = FieldKey::ALL.iter().map(|key| key.as_str()).collect();
    format!("Allowed keys: {}", keys.join(", "))
}

fn wrong_type(key: FieldKey, path: &str) -> ValidationIssue {
    let expected = match key.shape() {
        RequestShape::Flag => "a boolean",
        RequestShape::List => "a list of strings",
        RequestShape::ChoiceSet => "an object like {\"all\": bool, \"choices\": [string]}",
    };
    ValidationIssue::new(path, codes::WRONG_TYPE, format!("`{path}` must be {expected}"))
        .with_context_entry("expected", expected)
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl TryFrom<&Value> for InfoRequestSpec {
    type Error = RequestValidationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value, "info_request")
    }
}

impl TryFrom<Map<String, Value>> for InfoRequestSpec {
    type Error = RequestValidationError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_value(&Value::Object(map), "info_request")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: Value) -> Result<InfoRequestSpec, RequestValidationError> {
        InfoRequestSpec::try_from(&value)
    }

    #[test]
    fn test_template_round_trips_through_validation() {
        let template = InfoRequestSpec::template();
        let value = serde_json::to_value(&template).unwrap();

        assert_eq!(value["name"], json!(true));
        assert_eq!(value["site_socials"]["all"], json!(true));
        assert_eq!(value["pages_url"][0], json!("about"));
        assert_eq!(parse(value).unwrap(), template);
    }

    #[test]
    fn test_unknown_key_rejected_with_its_name() {
        let err = parse(json!({"name": true, "foo": true})).unwrap_err();

        assert_eq!(err.fields(), vec!["info_request.foo"]);
        assert_eq!(err.issues[0].code, codes::UNKNOWN_KEY);
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn test_unknown_key_hint_lists_allowed_keys() {
        let err = parse(json!({"nmae": true})).unwrap_err();
        let hint = err.issues[0].fix_hint.as_deref().unwrap();

        assert!(hint.starts_with("Allowed keys: "));
        for key in FieldKey::ALL {
            assert!(hint.contains(key.as_str()), "{key:?}");
        }
    }

    #[test]
    fn test_all_issues_collected() {
        let err = parse(json!({
            "name": "yes",
            "pages_url": "about",
            "site_socials": {"all": true, "colour": "red"},
            "bogus": 1
        }))
        .unwrap_err();

        let mut fields = err.fields();
        fields.sort_unstable();
        assert_eq!(
            fields,
            vec![
                "info_request.bogus",
                "info_request.name",
                "info_request.pages_url",
                "info_request.site_socials.colour",
            ]
        );
    }

    #[test]
    fn test_choice_set_value_types() {
        let err = parse(json!({"social_media_links": {"all": "yes", "choices": [1]}})).unwrap_err();
        assert!(err.has_field("info_request.social_media_links.all"));
        assert!(err.has_field("info_request.social_media_links.choices"));

        let err = parse(json!({"social_media_links": ["facebook"]})).unwrap_err();
        assert!(err.has_field("info_request.social_media_links"));
    }

    #[test]
    fn test_not_an_object() {
        let err = parse(json!(["name"])).unwrap_err();
        assert_eq!(err.issues[0].code, codes::NOT_OBJECT);
        assert_eq!(err.issues[0].context.get("type"), Some(&"array".to_string()));
    }

    #[test]
    fn test_invocations_skip_falsy_values() {
        let spec = parse(json!({
            "name": false,
            "logos": true,
            "pages_url": [],
            "site_socials": {"all": false, "choices": []},
            "social_media_links": {"all": false, "choices": [" Facebook ", "facebook", "X"]}
        }))
        .unwrap();

        assert_eq!(
            spec.invocations(),
            vec![
                (FieldKey::Logos, Invocation::Flag),
                (
                    FieldKey::SocialMediaLinks,
                    Invocation::Subset(vec!["facebook".to_string(), "x".to_string()])
                ),
            ]
        );
    }

    #[test]
    fn test_all_wins_over_choices() {
        let request = FieldRequest::Choices(ChoiceSet {
            all: true,
            choices: vec!["facebook".to_string()],
        });
        assert_eq!(request.invocation(), Some(Invocation::All));
    }

    #[test]
    fn test_insert_checks_shape() {
        let mut spec = InfoRequestSpec::new();
        assert!(spec.insert(FieldKey::Name, FieldRequest::Flag(true)).is_ok());
        assert!(spec
            .insert(FieldKey::PagesUrl, FieldRequest::Flag(true))
            .is_err());
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn test_field_key_parsing() {
        assert_eq!("all_emails".parse::<FieldKey>(), Ok(FieldKey::AllEmails));
        assert!("website_socials".parse::<FieldKey>().is_err());
        assert_eq!(FieldKey::SiteSocials.to_string(), "site_socials");
    }
}
