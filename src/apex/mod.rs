//! APEX composite-score profile: the richer per-ticker JSON behind the AI
//! report view, and its mapping into the canonical four-component shape.
//!
//! The generator guarantees nothing — every branch of the document may be
//! absent, so all extraction short-circuits to defaults.

use crate::models::{Basics, CompanyInfo, HistoricalSignal, PerfStats, SplitRisk};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Source schema (optional at every level) ──────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApexProfile {
    pub symbol: Option<String>,
    pub top_card: Option<TopCard>,
    pub comprehensive_apex: Option<ComprehensiveApex>,
    pub enrichment: Option<Enrichment>,
    pub crashdash: Option<CrashDash>,
    pub triangulation: Option<Triangulation>,
    pub ai_insights: Option<AiInsights>,
    pub scoring_breakdown: Option<ScoringBreakdown>,
    pub split_risk: Option<SplitRisk>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopCard {
    pub ticker: Option<String>,
    pub apex_score_100: Option<f64>,
    pub apex_rating: Option<String>,
    pub confidence_score_100: Option<f64>,
    pub setup_score_100: Option<f64>,
    pub trust_score_100: Option<f64>,
    pub panic_score_100: Option<f64>,
    pub compression_score_100: Option<f64>,
    pub ai_final_score_25: Option<f64>,
    pub timing_regime: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComprehensiveApex {
    pub score: Option<f64>,
    pub rating: Option<String>,
    pub components: Option<ApexComponents>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApexComponents {
    pub setup: Option<ComponentBreakdown>,
    pub trust: Option<ComponentBreakdown>,
    pub panic: Option<ComponentBreakdown>,
    pub compression: Option<ComponentBreakdown>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentBreakdown {
    pub score: Option<f64>,
    pub weight: Option<f64>,
    pub percentile: Option<f64>,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Enrichment {
    pub company_info: Option<CompanyInfo>,
    pub basics: Option<Basics>,
    pub stats: Option<PerfStats>,
    pub split_risk: Option<SplitRisk>,
    pub risk_flags: Option<Vec<String>>,
    pub all_historical_signals: Option<Vec<HistoricalSignal>>,
    pub std_error: Option<f64>,
    pub data_quality: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashDash {
    pub industry_intelligence: Option<IndustryIntelligence>,
    pub catalyst_pipeline: Option<Vec<serde_json::Value>>,
    pub panic_analysis: Option<PanicAnalysis>,
    pub contrarian_panic: Option<ContrarianPanic>,
    pub crashhunter_signals: Option<Vec<CrashHunterSignal>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryIntelligence {
    pub name: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub active_patterns: Option<Vec<String>>,
    pub recovery_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanicAnalysis {
    pub breakdown: Option<PanicBreakdown>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanicBreakdown {
    pub price_destruction: Option<f64>,
    pub social_silence: Option<f64>,
    pub news_sentiment: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrarianPanic {
    pub band: Option<String>,
    pub components: Option<ContrarianComponents>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrarianComponents {
    pub volume_death: Option<VolumeDeath>,
    pub compression: Option<CompressionDetailRaw>,
    pub intensification: Option<Intensification>,
    pub accumulation: Option<Accumulation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeDeath {
    pub relative_volume: Option<f64>,
    pub score: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionDetailRaw {
    pub signals_per_week: Option<f64>,
    pub rsi_extreme_count: Option<u64>,
    pub escalation_count: Option<u64>,
    pub best_historical_rally: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Intensification {
    pub score: Option<f64>,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Accumulation {
    pub score: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashHunterSignal {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Triangulation {
    pub social: Option<SocialSignal>,
    pub trends: Option<TrendsSignal>,
    pub rns: Option<RnsFeed>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialSignal {
    pub post_count: Option<u64>,
    pub buzz_level: Option<String>,
    pub has_data: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsSignal {
    pub intelligence_signal: Option<String>,
    pub current_interest: Option<f64>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RnsFeed {
    pub latest: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiInsights {
    pub company_30s: Option<Company30s>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Company30s {
    pub what_they_do: Option<String>,
    pub why_they_matter: Option<String>,
    pub current_state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringBreakdown {
    pub technical_score: Option<TechnicalScore>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalScore {
    pub ai_score: Option<f64>,
}

// ── Mapped view ───────────────────────────────────────────────────────────────

/// Coverage saturation constants: this many items count as full coverage.
const RNS_SATURATION: f64 = 50.0;
const SOCIAL_SATURATION: f64 = 1000.0;
const HISTORY_SATURATION: f64 = 1000.0;

/// Confidence interval half-width around the trust score.
const TRUST_CI_HALF_WIDTH: f64 = 8.0;

const DEFAULT_STD: f64 = 2.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ApexView {
    pub composite_score: f64,
    pub composite_label: String,
    pub components: Vec<ComponentView>,
    pub trust: TrustView,
    pub setup_detail: SetupDetail,
    pub panic_detail: PanicDetail,
    pub compression_detail: CompressionDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentView {
    pub name: &'static str,
    pub score: f64,
    pub weight: f64,
    pub percentile: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustView {
    pub score: f64,
    pub coverage: Vec<SourceCoverage>,
    pub sample_size: u64,
    pub std_error: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// One cross-source coverage row: RNS, social, trends or price history.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCoverage {
    pub source: &'static str,
    pub freshness: &'static str,
    /// Percentage in [0, 100].
    pub coverage: f64,
    /// Heuristic reliability in [0, 1], volume-threshold based.
    pub reliability: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupDetail {
    pub ai_technical_score: f64,
    pub drawdown_pct: f64,
    pub relative_volume: f64,
    pub rally_count: u64,
    pub best_historical_rally: f64,
    pub penalties: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanicDetail {
    pub price_destruction: f64,
    pub volume_death: f64,
    pub social_silence: f64,
    pub news_sentiment: f64,
    pub crash_signal: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionDetail {
    pub signals_per_week: f64,
    pub rsi_extreme_count: u64,
    pub escalation_events: u64,
    pub intensification_score: f64,
    pub intensification_pattern: String,
    pub pop_potential: f64,
    pub volume_death_score: f64,
    pub volume_death_desc: String,
    pub accumulation_score: f64,
    pub accumulation_desc: String,
    pub congestion_band: String,
}

fn clamp_pct(v: f64) -> f64 {
    v.round().clamp(0.0, 100.0)
}

impl ApexView {
    pub fn from_profile(p: &ApexProfile) -> ApexView {
        let top = p.top_card.as_ref();
        let apex = p.comprehensive_apex.as_ref();

        let composite_score = top
            .and_then(|t| t.apex_score_100)
            .or_else(|| apex.and_then(|a| a.score))
            .unwrap_or(0.0);
        let composite_label = top
            .and_then(|t| t.apex_rating.clone())
            .or_else(|| apex.and_then(|a| a.rating.clone()))
            .unwrap_or_default();

        let comps = apex.and_then(|a| a.components.as_ref());
        let components = vec![
            component_view("Setup", comps.and_then(|c| c.setup.as_ref()), top.and_then(|t| t.setup_score_100)),
            component_view("Trust", comps.and_then(|c| c.trust.as_ref()), top.and_then(|t| t.trust_score_100)),
            component_view("Panic", comps.and_then(|c| c.panic.as_ref()), top.and_then(|t| t.panic_score_100)),
            component_view(
                "Compression",
                comps.and_then(|c| c.compression.as_ref()),
                top.and_then(|t| t.compression_score_100),
            ),
        ];

        ApexView {
            composite_score,
            composite_label,
            components,
            trust: trust_view(p),
            setup_detail: setup_detail(p),
            panic_detail: panic_detail(p),
            compression_detail: compression_detail(p),
        }
    }
}

fn component_view(
    name: &'static str,
    raw: Option<&ComponentBreakdown>,
    flat_score: Option<f64>,
) -> ComponentView {
    let score = raw
        .and_then(|r| r.score)
        .or(flat_score)
        .unwrap_or(0.0);
    ComponentView {
        name,
        score,
        weight: raw.and_then(|r| r.weight).unwrap_or(0.0),
        percentile: raw.and_then(|r| r.percentile).unwrap_or_else(|| score.round()),
        std: raw.and_then(|r| r.std).unwrap_or(DEFAULT_STD),
    }
}

fn trust_view(p: &ApexProfile) -> TrustView {
    let enrichment = p.enrichment.as_ref();
    let triangulation = p.triangulation.as_ref();

    let rns_count = enrichment
        .and_then(|e| e.all_historical_signals.as_ref())
        .map(|v| v.len() as u64)
        .unwrap_or(0);
    let social_count = triangulation
        .and_then(|t| t.social.as_ref())
        .and_then(|s| s.post_count)
        .unwrap_or(0);
    let trends_exists = triangulation
        .and_then(|t| t.trends.as_ref())
        .and_then(|t| t.intelligence_signal.as_ref())
        .is_some();
    let history_bars = enrichment
        .and_then(|e| e.basics.as_ref())
        .and_then(|b| b.total_bars)
        .unwrap_or(0);

    let coverage = vec![
        SourceCoverage {
            source: "RNS",
            freshness: if rns_count > 0 { "Current" } else { "No data" },
            coverage: clamp_pct(rns_count as f64 / RNS_SATURATION * 100.0),
            reliability: if rns_count > 10 {
                0.95
            } else if rns_count > 0 {
                0.7
            } else {
                0.0
            },
        },
        SourceCoverage {
            source: "Social",
            freshness: if social_count > 0 { "Live" } else { "No data" },
            coverage: clamp_pct(social_count as f64 / SOCIAL_SATURATION * 100.0),
            reliability: if social_count > 100 {
                0.85
            } else if social_count > 0 {
                0.6
            } else {
                0.0
            },
        },
        SourceCoverage {
            source: "Trends",
            freshness: if trends_exists { "Active" } else { "N/A" },
            coverage: if trends_exists { 100.0 } else { 0.0 },
            reliability: if trends_exists { 0.75 } else { 0.0 },
        },
        SourceCoverage {
            source: "History",
            freshness: if history_bars > 0 { "Complete" } else { "No data" },
            coverage: clamp_pct(history_bars as f64 / HISTORY_SATURATION * 100.0),
            reliability: if history_bars > 500 {
                0.95
            } else if history_bars > 0 {
                0.7
            } else {
                0.0
            },
        },
    ];

    let score = p
        .top_card
        .as_ref()
        .and_then(|t| t.confidence_score_100)
        .unwrap_or(0.0);
    let (ci_low, ci_high) = if score > 0.0 {
        (
            (score - TRUST_CI_HALF_WIDTH).max(0.0),
            (score + TRUST_CI_HALF_WIDTH).min(100.0),
        )
    } else {
        (0.0, 0.0)
    };

    TrustView {
        score,
        coverage,
        sample_size: history_bars,
        std_error: enrichment.and_then(|e| e.std_error).unwrap_or(0.0),
        ci_low,
        ci_high,
    }
}

fn setup_detail(p: &ApexProfile) -> SetupDetail {
    let enrichment = p.enrichment.as_ref();
    let stats = enrichment.and_then(|e| e.stats.as_ref());
    let split_detected = p
        .split_risk
        .as_ref()
        .or_else(|| enrichment.and_then(|e| e.split_risk.as_ref()))
        .and_then(|s| s.split_detected)
        .unwrap_or(false);

    SetupDetail {
        ai_technical_score: p
            .scoring_breakdown
            .as_ref()
            .and_then(|s| s.technical_score.as_ref())
            .and_then(|t| t.ai_score)
            .or_else(|| p.top_card.as_ref().and_then(|t| t.ai_final_score_25))
            .unwrap_or(0.0),
        drawdown_pct: enrichment
            .and_then(|e| e.basics.as_ref())
            .and_then(|b| b.drawdown_from_ath_pct)
            .unwrap_or(0.0),
        relative_volume: volume_death(p)
            .and_then(|v| v.relative_volume)
            .unwrap_or(0.0),
        rally_count: stats.and_then(|s| s.total_signals).unwrap_or(0),
        best_historical_rally: stats.and_then(|s| s.best_rally_pct).unwrap_or(0.0),
        penalties: if split_detected {
            vec!["SPLIT_RISK".to_string()]
        } else {
            vec![]
        },
    }
}

fn panic_detail(p: &ApexProfile) -> PanicDetail {
    let breakdown = p
        .crashdash
        .as_ref()
        .and_then(|c| c.panic_analysis.as_ref())
        .and_then(|a| a.breakdown.as_ref());

    PanicDetail {
        price_destruction: breakdown.and_then(|b| b.price_destruction).unwrap_or(0.0),
        volume_death: volume_death(p)
            .and_then(|v| v.relative_volume)
            .unwrap_or(0.0),
        social_silence: breakdown.and_then(|b| b.social_silence).unwrap_or(0.0),
        news_sentiment: breakdown.and_then(|b| b.news_sentiment).unwrap_or(0.0),
        crash_signal: p
            .crashdash
            .as_ref()
            .and_then(|c| c.crashhunter_signals.as_ref())
            .and_then(|s| s.first())
            .and_then(|s| s.text.clone())
            .unwrap_or_default(),
    }
}

fn compression_detail(p: &ApexProfile) -> CompressionDetail {
    let contrarian = p.crashdash.as_ref().and_then(|c| c.contrarian_panic.as_ref());
    let comps = contrarian.and_then(|c| c.components.as_ref());
    let compression = comps.and_then(|c| c.compression.as_ref());
    let intensification = comps.and_then(|c| c.intensification.as_ref());
    let accumulation = comps.and_then(|c| c.accumulation.as_ref());
    let vd = volume_death(p);

    CompressionDetail {
        signals_per_week: compression.and_then(|c| c.signals_per_week).unwrap_or(0.0),
        rsi_extreme_count: compression.and_then(|c| c.rsi_extreme_count).unwrap_or(0),
        escalation_events: compression.and_then(|c| c.escalation_count).unwrap_or(0),
        intensification_score: intensification.and_then(|i| i.score).unwrap_or(0.0),
        intensification_pattern: intensification
            .and_then(|i| i.pattern.clone())
            .unwrap_or_default(),
        pop_potential: compression
            .and_then(|c| c.best_historical_rally)
            .or_else(|| {
                p.enrichment
                    .as_ref()
                    .and_then(|e| e.stats.as_ref())
                    .and_then(|s| s.best_rally_pct)
            })
            .unwrap_or(0.0),
        volume_death_score: vd.and_then(|v| v.score).unwrap_or(0.0),
        volume_death_desc: vd.and_then(|v| v.description.clone()).unwrap_or_default(),
        accumulation_score: accumulation.and_then(|a| a.score).unwrap_or(0.0),
        accumulation_desc: accumulation
            .and_then(|a| a.description.clone())
            .unwrap_or_default(),
        congestion_band: contrarian
            .and_then(|c| c.band.clone())
            .unwrap_or_else(|| "MOD".to_string()),
    }
}

fn volume_death(p: &ApexProfile) -> Option<&VolumeDeath> {
    p.crashdash
        .as_ref()?
        .contrarian_panic
        .as_ref()?
        .components
        .as_ref()?
        .volume_death
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_maps_to_zeroed_view() {
        let view = ApexView::from_profile(&ApexProfile::default());
        assert_eq!(view.composite_score, 0.0);
        assert_eq!(view.composite_label, "");
        assert_eq!(view.components.len(), 4);
        for c in &view.components {
            assert_eq!(c.score, 0.0);
            assert_eq!(c.percentile, 0.0);
            assert_eq!(c.std, DEFAULT_STD);
        }
        assert_eq!(view.trust.score, 0.0);
        assert_eq!(view.trust.ci_low, 0.0);
        assert_eq!(view.trust.ci_high, 0.0);
        assert!(view.trust.coverage.iter().all(|c| c.coverage == 0.0));
        assert_eq!(view.compression_detail.congestion_band, "MOD");
    }

    #[test]
    fn composite_prefers_top_card_then_apex() {
        let p: ApexProfile = serde_json::from_value(serde_json::json!({
            "comprehensive_apex": {"score": 55.0, "rating": "WATCH"}
        }))
        .unwrap();
        let view = ApexView::from_profile(&p);
        assert_eq!(view.composite_score, 55.0);
        assert_eq!(view.composite_label, "WATCH");

        let p: ApexProfile = serde_json::from_value(serde_json::json!({
            "top_card": {"apex_score_100": 82.0, "apex_rating": "STRONG"},
            "comprehensive_apex": {"score": 55.0, "rating": "WATCH"}
        }))
        .unwrap();
        let view = ApexView::from_profile(&p);
        assert_eq!(view.composite_score, 82.0);
        assert_eq!(view.composite_label, "STRONG");
    }

    #[test]
    fn component_falls_back_to_flat_top_card_score() {
        let p: ApexProfile = serde_json::from_value(serde_json::json!({
            "top_card": {"panic_score_100": 61.0},
            "comprehensive_apex": {
                "components": {
                    "setup": {"score": 70.0, "weight": 0.3, "percentile": 88.0, "std": 1.1}
                }
            }
        }))
        .unwrap();
        let view = ApexView::from_profile(&p);

        let setup = &view.components[0];
        assert_eq!(setup.score, 70.0);
        assert_eq!(setup.weight, 0.3);
        assert_eq!(setup.percentile, 88.0);
        assert_eq!(setup.std, 1.1);

        let panic = &view.components[2];
        assert_eq!(panic.score, 61.0);
        assert_eq!(panic.percentile, 61.0); // round(score) fallback
        assert_eq!(panic.std, DEFAULT_STD);
    }

    #[test]
    fn trust_coverage_saturates_and_clamps() {
        let p: ApexProfile = serde_json::from_value(serde_json::json!({
            "top_card": {"confidence_score_100": 96.0},
            "enrichment": {
                "all_historical_signals": (0..60).map(|_| serde_json::json!({})).collect::<Vec<_>>(),
                "basics": {"total_bars": 250}
            },
            "triangulation": {
                "social": {"post_count": 50},
                "trends": {"intelligence_signal": "RISING"}
            }
        }))
        .unwrap();
        let trust = ApexView::from_profile(&p).trust;

        let by_source = |name: &str| {
            trust
                .coverage
                .iter()
                .find(|c| c.source == name)
                .cloned()
                .unwrap()
        };

        let rns = by_source("RNS");
        assert_eq!(rns.coverage, 100.0); // 60/50 clamps
        assert_eq!(rns.reliability, 0.95);
        assert_eq!(rns.freshness, "Current");

        let social = by_source("Social");
        assert_eq!(social.coverage, 5.0); // 50/1000
        assert_eq!(social.reliability, 0.6);

        let trends = by_source("Trends");
        assert_eq!(trends.coverage, 100.0);
        assert_eq!(trends.reliability, 0.75);

        let history = by_source("History");
        assert_eq!(history.coverage, 25.0);
        assert_eq!(history.reliability, 0.7);

        assert_eq!(trust.sample_size, 250);
        assert_eq!(trust.ci_low, 88.0);
        assert_eq!(trust.ci_high, 100.0); // clamped from 104
    }

    #[test]
    fn deep_extras_survive_partial_documents() {
        let p: ApexProfile = serde_json::from_value(serde_json::json!({
            "crashdash": {
                "contrarian_panic": {
                    "band": "HIGH",
                    "components": {
                        "volume_death": {"relative_volume": 0.4, "score": 72.0},
                        "compression": {"signals_per_week": 1.5, "rsi_extreme_count": 4}
                    }
                },
                "crashhunter_signals": [{"text": "capitulation wick"}]
            },
            "enrichment": {"stats": {"best_rally_pct": 140.0, "total_signals": 6}}
        }))
        .unwrap();
        let view = ApexView::from_profile(&p);

        assert_eq!(view.panic_detail.volume_death, 0.4);
        assert_eq!(view.panic_detail.crash_signal, "capitulation wick");
        assert_eq!(view.compression_detail.signals_per_week, 1.5);
        assert_eq!(view.compression_detail.rsi_extreme_count, 4);
        // pop potential falls through to enrichment stats
        assert_eq!(view.compression_detail.pop_potential, 140.0);
        assert_eq!(view.compression_detail.congestion_band, "HIGH");
        assert_eq!(view.setup_detail.rally_count, 6);
        assert_eq!(view.setup_detail.relative_volume, 0.4);
    }
}
