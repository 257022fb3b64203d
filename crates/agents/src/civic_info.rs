//! Agent interfacing the civic-info API with the pub/sub context.
//!
//! Subscribes to `ADDRESS` and `REGION`. A change triggers a lookup; the
//! outcome lands back in the context as `CIVIC_INFO` (the normalized
//! response, or null) and `NOTICE` (a user-facing message, or null to clear
//! any displayed alert).

use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use voterinfo_api::civic_info::{CivicInfoApi, LookupResult};
use voterinfo_core::civic::CivicInfoResponse;
use voterinfo_core::context::{Context, SubscriptionId, keys};
use voterinfo_core::{Notice, Status};

/// Agent that owns the civic-info lookup pipeline.
pub struct CivicInfoAgent {
    context: Arc<Context>,
    api: Arc<CivicInfoApi>,
    subscriptions: Vec<SubscriptionId>,
}

impl CivicInfoAgent {
    pub fn new(context: Arc<Context>, api: CivicInfoApi) -> Self {
        Self {
            context,
            api: Arc::new(api),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to the trigger keys. Must be called once before the agent
    /// does anything useful.
    pub fn init(&mut self) {
        for trigger in [keys::ADDRESS, keys::REGION] {
            let api = Arc::clone(&self.api);
            let context = Arc::downgrade(&self.context);
            let id = self.context.subscribe(trigger, move |new, old| {
                handle_trigger_change(trigger, &api, &context, new, old);
            });
            self.subscriptions.push(id);
        }
    }

    /// Drop the agent's subscriptions. The context must still be live.
    pub fn dispose(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.context.unsubscribe_by_id(id);
        }
    }
}

fn handle_trigger_change(
    trigger: &'static str,
    api: &Arc<CivicInfoApi>,
    context: &Weak<Context>,
    new: Option<&Value>,
    old: Option<&Value>,
) {
    let address = new.and_then(Value::as_str).unwrap_or_default().to_string();
    let previous = old.and_then(Value::as_str).unwrap_or_default();
    if address.is_empty() || address == previous {
        return;
    }

    debug!(trigger = %trigger, "Address changed, starting lookup");
    let api = Arc::clone(api);
    let context = context.clone();
    tokio::spawn(async move {
        let result = api.lookup(&address).await;
        if let Some(context) = context.upgrade() {
            publish_outcome(&context, trigger, result);
        }
    });
}

fn publish_outcome(context: &Context, trigger: &'static str, result: LookupResult) {
    let Some(mut response) = result.response else {
        warn!(trigger = %trigger, "Lookup failed terminally");
        let notice = notice_for_status(Status::RequestFailure, None);
        context.set(keys::NOTICE, notice.to_value());
        context.set(keys::CIVIC_INFO, Value::Null);
        return;
    };

    if response.status != Status::Success {
        // A region guess that the API cannot parse is not worth alarming
        // the user about; anything else maps to a notice.
        let suppressed = response.status == Status::AddressUnparseable && trigger == keys::REGION;
        if !suppressed {
            let notice = notice_for_status(response.status, Some(&response));
            context.set(keys::NOTICE, notice.to_value());
            context.set(keys::CIVIC_INFO, Value::Null);
            return;
        }
    }

    if is_test_election(&response) {
        context.set(keys::NOTICE, test_election_notice(&response).to_value());
    } else {
        context.set(keys::NOTICE, Value::Null);
    }

    response.request_trigger = Some(trigger.to_string());
    context.set(
        keys::CIVIC_INFO,
        serde_json::to_value(&response).unwrap_or(Value::Null),
    );
}

/// Whether the returned election is a test election (its name contains the
/// word "test").
fn is_test_election(response: &CivicInfoResponse) -> bool {
    response
        .election
        .as_ref()
        .and_then(|e| e.name.as_deref())
        .is_some_and(|name| {
            name.split_whitespace()
                .any(|word| word.eq_ignore_ascii_case("test"))
        })
}

/// Map a lookup status to a user-facing notice. Unmapped statuses get the
/// generic failure message.
pub fn notice_for_status(status: Status, response: Option<&CivicInfoResponse>) -> Notice {
    let desc = suggest_official_website(response);
    match status {
        Status::NoStreetSegmentFound => Notice::info(
            "We were unable to find the voting information for your address.",
            desc,
        ),
        Status::AddressUnparseable => Notice::error(
            "We did not understand your address. Please make sure it is spelled \
             correctly and includes a city and state.",
            desc,
        ),
        Status::MultipleStreetSegmentsFound => Notice::error(
            "We were unable to find accurate information for your address.",
            desc,
        ),
        Status::ElectionOver => Notice::info(election_over_title(response), desc),
        Status::ElectionUnknown => Notice::warning(
            "This application has been configured incorrectly. If you maintain \
             the application, please make sure you are providing a valid election id.",
            desc,
        ),
        // noAddressParameter, internalLookupFailure, requestFailure, and
        // anything unmapped share the generic failure message.
        _ => Notice::error(
            "We encountered an error and could not complete your request. If the \
             problem persists, please report your problem and mention this error \
             message and the query that caused it. That's all we know.",
            desc,
        ),
    }
}

fn election_over_title(response: Option<&CivicInfoResponse>) -> String {
    let election = response.and_then(|r| r.election.as_ref());
    match election.and_then(|e| e.name.as_deref().zip(e.election_day.as_deref())) {
        Some((name, day)) => format!(
            "The election \"{name}\" took place on {day}. Voter information is \
             no longer available for this election."
        ),
        None => "The election has already taken place. Voter information is no \
                 longer available."
            .to_string(),
    }
}

fn test_election_notice(response: &CivicInfoResponse) -> Notice {
    Notice::warning(
        "This data is for testing purposes only.",
        suggest_official_website(Some(response)),
    )
}

/// Suggest where the user can find authoritative information: the state
/// election administration body's location finder when the response names
/// one, else a generic pointer.
fn suggest_official_website(response: Option<&CivicInfoResponse>) -> String {
    let body = response
        .and_then(|r| r.state.first())
        .and_then(|region| region.election_administration_body.as_ref());
    match body.and_then(|b| b.name.as_deref().zip(b.voting_location_finder_url.as_deref())) {
        Some((name, url)) => {
            format!("Check the {name} website for complete voter information: {url}")
        }
        None => "Contact your local election official for complete voter information.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use voterinfo_api::client::ApiClient;
    use voterinfo_api::transport::{ApiRequest, ApiResponse, Transport};
    use voterinfo_config::AppConfig;
    use voterinfo_core::NoticeLevel;

    struct FixtureTransport(Value);

    #[async_trait]
    impl Transport for FixtureTransport {
        async fn execute(&self, _request: &ApiRequest) -> ApiResponse {
            ApiResponse {
                json: Some(self.0.clone()),
                raw: self.0.to_string(),
            }
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn execute(&self, _request: &ApiRequest) -> ApiResponse {
            ApiResponse::failure()
        }
    }

    fn agent_over(transport: Arc<dyn Transport>) -> (Arc<Context>, CivicInfoAgent) {
        let context = Arc::new(Context::new());
        let api = CivicInfoApi::new(ApiClient::new(transport), &AppConfig::default()).unwrap();
        let mut agent = CivicInfoAgent::new(Arc::clone(&context), api);
        agent.init();
        (context, agent)
    }

    async fn wait_for_key(context: &Context, key: &str) -> Value {
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                if let Some(value) = context.get(key) {
                    return value;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("context key never set")
    }

    #[tokio::test(start_paused = true)]
    async fn address_change_publishes_civic_info() {
        let (context, _agent) = agent_over(Arc::new(FixtureTransport(json!({
            "status": "success",
            "election": {"id": "4000", "name": "General Election", "electionDay": "2012-11-06"}
        }))));

        context.set(keys::ADDRESS, "1 Main St, Springfield, IL");

        let civic_info = wait_for_key(&context, keys::CIVIC_INFO).await;
        assert_eq!(civic_info["status"], "success");
        assert_eq!(civic_info["requestTrigger"], "address");
        // A live election clears the notice
        assert_eq!(context.get(keys::NOTICE), Some(Value::Null));
    }

    #[tokio::test(start_paused = true)]
    async fn test_election_publishes_warning() {
        let (context, _agent) = agent_over(Arc::new(FixtureTransport(json!({
            "status": "success",
            "election": {"id": "2000", "name": "VIP Test Election"}
        }))));

        context.set(keys::ADDRESS, "1 Main St");

        let civic_info = wait_for_key(&context, keys::CIVIC_INFO).await;
        assert_eq!(civic_info["status"], "success");
        let notice = context.get(keys::NOTICE).unwrap();
        assert_eq!(notice["type"], "warning");
        assert!(notice["title"].as_str().unwrap().contains("testing purposes"));
    }

    #[tokio::test(start_paused = true)]
    async fn domain_error_publishes_notice_and_clears_civic_info() {
        let (context, _agent) = agent_over(Arc::new(FixtureTransport(json!({
            "status": "addressUnparseable"
        }))));

        context.set(keys::ADDRESS, "gibberish");

        let civic_info = wait_for_key(&context, keys::CIVIC_INFO).await;
        assert_eq!(civic_info, Value::Null);
        let notice = context.get(keys::NOTICE).unwrap();
        assert_eq!(notice["type"], "error");
        assert!(notice["title"].as_str().unwrap().contains("did not understand"));
    }

    #[tokio::test(start_paused = true)]
    async fn region_triggered_unparseable_is_suppressed() {
        let (context, _agent) = agent_over(Arc::new(FixtureTransport(json!({
            "status": "addressUnparseable"
        }))));

        context.set(keys::REGION, "ZZ");

        // The response is still published, but no error notice appears.
        let civic_info = wait_for_key(&context, keys::CIVIC_INFO).await;
        assert_eq!(civic_info["status"], "addressUnparseable");
        assert_eq!(civic_info["requestTrigger"], "region");
        assert_eq!(context.get(keys::NOTICE), Some(Value::Null));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_publishes_generic_notice() {
        let (context, _agent) = agent_over(Arc::new(FailingTransport));

        context.set(keys::ADDRESS, "1 Main St");

        let civic_info = wait_for_key(&context, keys::CIVIC_INFO).await;
        assert_eq!(civic_info, Value::Null);
        let notice = context.get(keys::NOTICE).unwrap();
        assert_eq!(notice["type"], "error");
        assert!(notice["title"].as_str().unwrap().contains("encountered an error"));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_or_empty_address_is_ignored() {
        let (context, _agent) = agent_over(Arc::new(FailingTransport));

        context.set(keys::ADDRESS, "");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(context.get(keys::CIVIC_INFO), None);

        context.set(keys::ADDRESS, "1 Main St");
        let _ = wait_for_key(&context, keys::CIVIC_INFO).await;
        context.remove(keys::CIVIC_INFO);

        // Same value again: publish happens (no dedup in the store) but the
        // agent skips the lookup.
        context.set(keys::ADDRESS, "1 Main St");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(context.get(keys::CIVIC_INFO), None);
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_agent_stops_reacting() {
        let (context, mut agent) = agent_over(Arc::new(FailingTransport));
        agent.dispose();

        context.set(keys::ADDRESS, "1 Main St");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(context.get(keys::CIVIC_INFO), None);
    }

    #[test]
    fn notice_table_maps_statuses() {
        let notice = notice_for_status(Status::NoStreetSegmentFound, None);
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.title.contains("unable to find"));

        let notice = notice_for_status(Status::ElectionUnknown, None);
        assert_eq!(notice.level, NoticeLevel::Warning);

        // Unmapped statuses fall back to the generic failure
        let notice = notice_for_status(Status::Unknown, None);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.title.contains("That's all we know."));
    }

    #[test]
    fn election_over_title_includes_name_and_day() {
        let response: CivicInfoResponse = serde_json::from_value(json!({
            "status": "electionOver",
            "election": {"name": "Municipal Election", "electionDay": "2012-06-05"}
        }))
        .unwrap();
        let notice = notice_for_status(Status::ElectionOver, Some(&response));
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.title.contains("Municipal Election"));
        assert!(notice.title.contains("2012-06-05"));
    }

    #[test]
    fn description_suggests_official_website_when_known() {
        let response: CivicInfoResponse = serde_json::from_value(json!({
            "status": "noStreetSegmentFound",
            "state": [{
                "electionAdministrationBody": {
                    "name": "Illinois State Board of Elections",
                    "votingLocationFinderUrl": "https://ova.elections.il.gov"
                }
            }]
        }))
        .unwrap();
        let notice = notice_for_status(Status::NoStreetSegmentFound, Some(&response));
        assert!(notice.desc.contains("Illinois State Board of Elections"));
        assert!(notice.desc.contains("https://ova.elections.il.gov"));

        let fallback = notice_for_status(Status::NoStreetSegmentFound, None);
        assert!(fallback.desc.contains("local election official"));
    }

    #[test]
    fn test_election_detection_is_word_based() {
        let named = |name: &str| CivicInfoResponse {
            election: Some(serde_json::from_value(json!({"name": name})).unwrap()),
            ..CivicInfoResponse::default()
        };
        assert!(is_test_election(&named("VIP Test Election")));
        assert!(is_test_election(&named("TEST run")));
        assert!(!is_test_election(&named("Contested Primary")));
        assert!(!is_test_election(&CivicInfoResponse::default()));
    }
}
