//! Civic information domain model.
//!
//! The normalized shape of a voter-info lookup: election descriptor,
//! normalized input address, polling locations, early-vote sites, ordered
//! contests, and the election-administration region tree. The upstream API
//! omits or nulls sub-objects freely, so every field is optional and absent
//! values pass through rather than failing deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Potential values for the lookup status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Success,
    NoStreetSegmentFound,
    AddressUnparseable,
    NoAddressParameter,
    MultipleStreetSegmentsFound,
    ElectionOver,
    ElectionUnknown,
    InternalLookupFailure,
    /// Synthesized locally when the transport gives up; never sent by the API.
    #[serde(rename = "REQUEST_FAILURE")]
    RequestFailure,
    /// Catch-all for statuses this client does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Normalized result of a voter-info lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CivicInfoResponse {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub election: Option<Election>,
    #[serde(default)]
    pub normalized_input: Option<Address>,
    #[serde(default)]
    pub polling_locations: Vec<PollingLocation>,
    #[serde(default)]
    pub early_vote_sites: Vec<PollingLocation>,
    #[serde(default)]
    pub contests: Vec<Contest>,
    /// Administration regions, state first, local jurisdictions nested.
    #[serde(default, rename = "state")]
    pub state: Vec<AdministrationRegion>,
    /// Which context key triggered the lookup; stamped on by the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_trigger: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub election_day: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub line3: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

impl Address {
    /// Formats the address as a single display line:
    /// `locationName, line1, line2, line3, city, state zip` with absent
    /// parts skipped and the trailing separator trimmed.
    pub fn format(&self, ignore_location_name: bool, ignore_zip: bool) -> String {
        let mut out = String::new();
        let comma_part = |part: &Option<String>, out: &mut String| {
            if let Some(p) = filled(part) {
                out.push_str(p);
                out.push_str(", ");
            }
        };
        if !ignore_location_name {
            comma_part(&self.location_name, &mut out);
        }
        comma_part(&self.line1, &mut out);
        comma_part(&self.line2, &mut out);
        comma_part(&self.line3, &mut out);
        comma_part(&self.city, &mut out);
        if let Some(state) = filled(&self.state) {
            out.push_str(state);
            out.push(' ');
        }
        if !ignore_zip {
            if let Some(zip) = filled(&self.zip) {
                out.push_str(zip);
            }
        }
        let trimmed = out.trim();
        trimmed.strip_suffix(',').unwrap_or(trimmed).to_string()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format(false, false))
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingLocation {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub polling_hours: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub voter_services: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub official: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub candidate_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub order_on_ballot: Option<u32>,
    #[serde(default, deserialize_with = "channels_from_any")]
    pub channels: Channels,
}

/// A candidate's social channels, collapsed from the upstream `[{type, id}]`
/// list into a fixed shape. Unrecognized channel types are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channels {
    #[serde(default)]
    pub googleplus: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
}

/// One entry of the upstream channel list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelEntry {
    #[serde(default, rename = "type")]
    pub channel_type: String,
    #[serde(default)]
    pub id: String,
}

impl Channels {
    /// Collapse a channel list by case-insensitive type match.
    pub fn from_entries(entries: &[ChannelEntry]) -> Self {
        let mut out = Self::default();
        for entry in entries {
            let id = entry.id.clone();
            match entry.channel_type.to_lowercase().as_str() {
                "googleplus" => out.googleplus = Some(id),
                "youtube" => out.youtube = Some(id),
                "facebook" => out.facebook = Some(id),
                "twitter" => out.twitter = Some(id),
                _ => {}
            }
        }
        out
    }
}

/// Accepts either the upstream list form or the already-collapsed struct
/// form, so normalized responses stored in the context re-parse cleanly.
fn channels_from_any<'de, D>(deserializer: D) -> Result<Channels, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        List(Vec<ChannelEntry>),
        Shape(Channels),
    }
    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::List(entries)) => Channels::from_entries(&entries),
        Some(Repr::Shape(channels)) => channels,
        None => Channels::default(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    #[serde(default, rename = "type")]
    pub contest_type: Option<String>,
    #[serde(default)]
    pub primary_party: Option<String>,
    #[serde(default)]
    pub electorate_specifications: Option<String>,
    #[serde(default)]
    pub special: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub district: Option<District>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub number_elected: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub number_voting_for: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub ballot_placement: Option<u32>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrationRegion {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub election_administration_body: Option<ElectionAdministrationBody>,
    #[serde(default, rename = "local_jurisdiction")]
    pub local_jurisdiction: Option<Box<AdministrationRegion>>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionAdministrationBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub election_info_url: Option<String>,
    #[serde(default)]
    pub election_registration_url: Option<String>,
    #[serde(default)]
    pub election_registration_confirmation_url: Option<String>,
    #[serde(default)]
    pub absentee_voting_info_url: Option<String>,
    #[serde(default)]
    pub voting_location_finder_url: Option<String>,
    #[serde(default)]
    pub ballot_info_url: Option<String>,
    #[serde(default)]
    pub election_rules_url: Option<String>,
    #[serde(default, rename = "voter_services")]
    pub voter_services: Option<Vec<String>>,
    #[serde(default)]
    pub hours_of_operation: Option<String>,
    #[serde(default)]
    pub correspondence_address: Option<Address>,
    #[serde(default)]
    pub physical_address: Option<Address>,
    #[serde(default)]
    pub election_officials: Vec<ElectionOfficial>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionOfficial {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub office_phone_number: Option<String>,
    #[serde(default)]
    pub fax_number: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

/// The order by which to sort office levels in contests.
fn level_rank(level: &str) -> Option<u32> {
    match level {
        "federal" => Some(0),
        "state" => Some(1),
        "county" => Some(2),
        "city" => Some(3),
        "other" => Some(4),
        _ => None,
    }
}

/// The order by which to sort scoped contests.
fn scope_rank(scope: &str) -> Option<u32> {
    match scope {
        "statewide" => Some(0),
        "congressional" => Some(1),
        "stateUpper" => Some(2),
        "stateLower" => Some(3),
        "countywide" => Some(4),
        "judicial" => Some(5),
        "schoolBoard" => Some(6),
        "cityWide" => Some(7),
        "special" => Some(8),
        _ => None,
    }
}

fn contest_sort_key(contest: &Contest) -> (u64, u64, u64) {
    let placement = contest
        .ballot_placement
        .map(u64::from)
        .unwrap_or(u64::MAX);
    let level = contest
        .level
        .as_deref()
        .and_then(level_rank)
        .map(u64::from)
        .unwrap_or(u64::MAX);
    let scope = contest
        .district
        .as_ref()
        .and_then(|d| d.scope.as_deref())
        .and_then(scope_rank)
        .map(u64::from)
        .unwrap_or(u64::MAX);
    (placement, level, scope)
}

/// Drops contests with no candidates and sorts the rest by
/// (ballot placement, office level, district scope), missing values last.
/// The sort is stable: ties keep their original relative order.
pub fn normalize_contests(contests: Vec<Contest>) -> Vec<Contest> {
    let mut kept: Vec<Contest> = contests
        .into_iter()
        .filter(|c| !c.candidates.is_empty())
        .collect();
    kept.sort_by_key(contest_sort_key);
    kept
}

/// Accepts a string, integer, or null for fields the upstream API types
/// inconsistently.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts a number or a numeric string; anything else is treated as absent.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
