use serde::{Deserialize, Serialize};

/// Closed set of intent categories a user message can classify into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AdCreation,
    AnalyticsQuery,
    FilterManagement,
    MerchantSupport,
    OfferManagement,
    GeneralAssistance,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::AdCreation,
        Intent::AnalyticsQuery,
        Intent::FilterManagement,
        Intent::MerchantSupport,
        Intent::OfferManagement,
        Intent::GeneralAssistance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdCreation => "ad_creation",
            Self::AnalyticsQuery => "analytics_query",
            Self::FilterManagement => "filter_management",
            Self::MerchantSupport => "merchant_support",
            Self::OfferManagement => "offer_management",
            Self::GeneralAssistance => "general_assistance",
        }
    }

    pub fn parse(raw: &str) -> Option<Intent> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|intent| intent.as_str() == normalized)
    }
}

/// Closed set of handlers the router can dispatch to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerName {
    CampaignAgent,
    AnalyticsAgent,
    FilterAgent,
    MerchantAgent,
    OfferManagerAgent,
    GeneralAssistant,
}

impl HandlerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CampaignAgent => "campaign_agent",
            Self::AnalyticsAgent => "analytics_agent",
            Self::FilterAgent => "filter_agent",
            Self::MerchantAgent => "merchant_agent",
            Self::OfferManagerAgent => "offer_manager_agent",
            Self::GeneralAssistant => "general_assistant",
        }
    }
}

/// Total routing table over the closed intent set. Unmapped values cannot
/// exist at this boundary; strings from the wire go through `Intent::parse`
/// first and fall back to `GeneralAssistance` there.
pub fn route(intent: Intent) -> HandlerName {
    match intent {
        Intent::AdCreation => HandlerName::CampaignAgent,
        Intent::AnalyticsQuery => HandlerName::AnalyticsAgent,
        Intent::FilterManagement => HandlerName::FilterAgent,
        Intent::MerchantSupport => HandlerName::MerchantAgent,
        Intent::OfferManagement => HandlerName::OfferManagerAgent,
        Intent::GeneralAssistance => HandlerName::GeneralAssistant,
    }
}

const OFFER_TERMS: [&str; 6] = ["offer", "promotion", "deal", "discount", "coupon", "promo"];
const AD_TERMS: [&str; 5] = ["create ad", "new ad", "campaign", "advertisement", "advert"];
const ANALYTICS_TERMS: [&str; 5] = ["analytics", "performance", "metrics", "report", "stats"];
const FILTER_TERMS: [&str; 4] = ["filter", "targeting", "audience", "segment"];
const MERCHANT_TERMS: [&str; 4] = ["merchant", "business", "account", "setup"];

/// Deterministic keyword classifier, used when the completion service is
/// unavailable or returns something unusable. Offer terms are checked before
/// ad terms so that "offer campaign" stays in offer management.
pub fn classify_keywords(text: &str) -> Intent {
    let lower = text.to_ascii_lowercase();
    let contains_any = |terms: &[&str]| terms.iter().any(|term| lower.contains(term));

    if contains_any(&OFFER_TERMS) {
        Intent::OfferManagement
    } else if contains_any(&AD_TERMS) {
        Intent::AdCreation
    } else if contains_any(&ANALYTICS_TERMS) {
        Intent::AnalyticsQuery
    } else if contains_any(&FILTER_TERMS) {
        Intent::FilterManagement
    } else if contains_any(&MERCHANT_TERMS) {
        Intent::MerchantSupport
    } else {
        Intent::GeneralAssistance
    }
}
