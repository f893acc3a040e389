use super::{
    AdInsertion, AdOrigin, CONFLICT_WINDOW_SECS, ConfigurationError, MAX_GLOBAL_CANDIDATES,
    Schedule,
};
use crate::models::{AdConfig, Campaign, GlobalInjectionRule, InjectionSource, Video};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Creative resolved from the rule's source, stamped onto every global slot.
#[derive(Debug, Clone)]
struct Template {
    locator: String,
    click_through: Option<String>,
    duration: f64,
    skip_after: f64,
    label: String,
    origin: AdOrigin,
}

/// Merge the schedule for a catalog video.
pub fn merge_for_video(
    video: &Video,
    rule: &GlobalInjectionRule,
    campaigns: &[Campaign],
) -> Schedule {
    merge(&video.id, &video.ads, rule, campaigns, video.duration)
}

/// Merge manual ads with the global injection rule.
///
/// Manual ads are kept as configured. Global candidates are generated at
/// every positive multiple of the rule interval below `video_duration` and
/// dropped when they land within [`CONFLICT_WINDOW_SECS`] of anything
/// already accepted, so earlier entries always win. The result is sorted by
/// start time; ties keep manual entries first.
///
/// Pure and deterministic: global ids are derived from the video id and the
/// slot time only.
pub fn merge(
    video_id: &str,
    manual_ads: &[AdConfig],
    rule: &GlobalInjectionRule,
    campaigns: &[Campaign],
    video_duration: f64,
) -> Schedule {
    let mut warnings = Vec::new();
    let mut insertions = manual_insertions(manual_ads, &mut warnings);

    if rule.enabled
        && let Some(template) = resolve_template(rule, campaigns, &mut warnings)
    {
        inject_global(
            video_id,
            &template,
            rule.interval_seconds,
            video_duration,
            &mut insertions,
            &mut warnings,
        );
    }

    // Vec::sort_by is stable, which keeps manual entries ahead on ties
    insertions.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    for warning in &warnings {
        warn!("Ad schedule for video {}: {}", video_id, warning);
    }
    debug!(
        "Merged ad schedule for video {}: {} insertions",
        video_id,
        insertions.len()
    );

    Schedule {
        insertions,
        warnings,
    }
}

/// Problems an enabled rule would report on every merge, found without a
/// video. A disabled rule is never checked.
pub fn check_rule(rule: &GlobalInjectionRule, campaigns: &[Campaign]) -> Vec<ConfigurationError> {
    let mut warnings = Vec::new();
    if !rule.enabled {
        return warnings;
    }
    if !rule.interval_seconds.is_finite() || rule.interval_seconds <= 0.0 {
        warnings.push(ConfigurationError::NonPositiveInterval(rule.interval_seconds));
    }
    resolve_template(rule, campaigns, &mut warnings);
    warnings
}

fn manual_insertions(
    manual_ads: &[AdConfig],
    warnings: &mut Vec<ConfigurationError>,
) -> Vec<AdInsertion> {
    let mut seen = HashSet::new();
    let mut insertions = Vec::with_capacity(manual_ads.len());

    for ad in manual_ads {
        let valid_start = ad.start_time.is_finite() && ad.start_time >= 0.0;
        let valid_duration = ad.duration.is_finite() && ad.duration > 0.0;
        if !valid_start || !valid_duration {
            warnings.push(ConfigurationError::InvalidManualAd(ad.id.clone()));
            continue;
        }
        if !seen.insert(ad.id.as_str()) {
            warnings.push(ConfigurationError::DuplicateAdId(ad.id.clone()));
            continue;
        }

        insertions.push(AdInsertion {
            id: ad.id.clone(),
            start_time: ad.start_time,
            duration: ad.duration,
            skip_after: clamp_skip_after(ad.skip_after, ad.duration),
            ad_stream_locator: ad.video_src.clone(),
            click_through: non_empty(&ad.redirect_url),
            label: ad.title.clone(),
            origin: AdOrigin::Manual,
        });
    }

    insertions
}

fn resolve_template(
    rule: &GlobalInjectionRule,
    campaigns: &[Campaign],
    warnings: &mut Vec<ConfigurationError>,
) -> Option<Template> {
    let template = source_template(rule, campaigns, warnings)?;
    if !template.duration.is_finite() || template.duration <= 0.0 {
        warnings.push(ConfigurationError::NonPositiveAdDuration(template.duration));
        return None;
    }
    Some(template)
}

fn source_template(
    rule: &GlobalInjectionRule,
    campaigns: &[Campaign],
    warnings: &mut Vec<ConfigurationError>,
) -> Option<Template> {
    match &rule.source {
        InjectionSource::Campaign { campaign_id } => {
            if campaign_id.is_empty() {
                warnings.push(ConfigurationError::EmptyCampaignId);
                return None;
            }
            let Some(campaign) = campaigns.iter().find(|c| &c.id == campaign_id) else {
                warnings.push(ConfigurationError::UnknownCampaign(campaign_id.clone()));
                return None;
            };
            Some(Template {
                locator: campaign.video_src.clone(),
                click_through: non_empty(&campaign.redirect_url),
                duration: campaign.default_duration,
                skip_after: campaign.default_skip_after,
                label: format!("[Global] {}", campaign.name),
                origin: AdOrigin::GlobalCampaign,
            })
        }
        InjectionSource::Direct {
            ad_stream_locator,
            click_through,
            duration,
            skip_after,
        } => {
            if ad_stream_locator.is_empty() {
                warnings.push(ConfigurationError::EmptyDirectLocator);
                return None;
            }
            Some(Template {
                locator: ad_stream_locator.clone(),
                click_through: click_through.as_deref().and_then(non_empty),
                duration: *duration,
                skip_after: *skip_after,
                label: "[Global] Direct Ad".to_string(),
                origin: AdOrigin::GlobalDirect,
            })
        }
    }
}

fn inject_global(
    video_id: &str,
    template: &Template,
    interval: f64,
    video_duration: f64,
    insertions: &mut Vec<AdInsertion>,
    warnings: &mut Vec<ConfigurationError>,
) {
    if !interval.is_finite() || interval <= 0.0 {
        warnings.push(ConfigurationError::NonPositiveInterval(interval));
        return;
    }
    if !video_duration.is_finite() || video_duration <= 0.0 {
        return;
    }

    let skip_after = clamp_skip_after(template.skip_after, template.duration);
    let taken: HashSet<String> = insertions.iter().map(|ad| ad.id.clone()).collect();

    let mut manual_times: Vec<f64> = insertions.iter().map(|ad| ad.start_time).collect();
    manual_times.sort_by(f64::total_cmp);
    let mut last_global: Option<f64> = None;

    // Slots are computed as k * interval rather than accumulated so that
    // repeated merges land on bit-identical times (and therefore ids).
    let mut k: u64 = 1;
    loop {
        let t = k as f64 * interval;
        if t >= video_duration {
            break;
        }
        if k > MAX_GLOBAL_CANDIDATES {
            warnings.push(ConfigurationError::TooManyCandidates(MAX_GLOBAL_CANDIDATES));
            break;
        }
        k += 1;

        if conflicts(&manual_times, last_global, t) {
            debug!(
                "Skipping global ad slot at {}s for video {}: conflicts with existing ad",
                t, video_id
            );
            continue;
        }

        let id = format!("global_{}_{}", video_id, t);
        if taken.contains(&id) {
            warnings.push(ConfigurationError::DuplicateAdId(id));
            continue;
        }

        insertions.push(AdInsertion {
            id,
            start_time: t,
            duration: template.duration,
            skip_after,
            ad_stream_locator: template.locator.clone(),
            click_through: template.click_through.clone(),
            label: template.label.clone(),
            origin: template.origin,
        });
        last_global = Some(t);
    }
}

/// True when `t` lies within the conflict window of a manual start time or
/// of the most recent accepted global slot. Global slots are accepted in
/// ascending order, so the latest one is the only candidate for a clash.
fn conflicts(manual_times: &[f64], last_global: Option<f64>, t: f64) -> bool {
    if last_global.is_some_and(|g| t - g < CONFLICT_WINDOW_SECS) {
        return true;
    }
    let idx = manual_times.partition_point(|&m| m <= t - CONFLICT_WINDOW_SECS);
    manual_times
        .get(idx)
        .is_some_and(|&m| m < t + CONFLICT_WINDOW_SECS)
}

fn clamp_skip_after(skip_after: f64, duration: f64) -> f64 {
    if skip_after.is_finite() {
        skip_after.clamp(0.0, duration)
    } else {
        duration
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
