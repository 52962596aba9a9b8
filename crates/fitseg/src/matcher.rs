//! Extracts segment attempts from one track.

use time::Duration;
use tracing::{debug, info, warn};

use crate::config::MatchConfig;
use crate::errors::Result;
use crate::models::{Attempt, SegmentDefinition, Track, TrackPoint};
use crate::scoring::{Channel, compute_metric};
use crate::segment_matching::{find_candidates, get_challenges};
use crate::traces::TraceWriters;

/// Shortest attempt a time-weighted metric is computed over. Shorter ones are
/// kept with every metric left empty.
const MIN_ATTEMPT_DURATION: Duration = Duration::seconds(2);

#[derive(Debug, Clone, Default)]
pub struct SegmentMatcher {
    config: MatchConfig,
}

impl SegmentMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Search `track` for every definition, in order, and return one attempt
    /// per start/stop pair found.
    ///
    /// A definition whose start or stop is never approached is simply not
    /// attempted. Points without a GPS fix take no part in the search, and
    /// attempt metrics are computed over fixed points only.
    pub fn match_track<'d>(
        &self,
        track: &Track,
        definitions: impl IntoIterator<Item = &'d SegmentDefinition>,
        traces: &mut TraceWriters,
    ) -> Result<Vec<Attempt>> {
        let fixed: Vec<TrackPoint> = track
            .points()
            .iter()
            .filter(|p| p.position().is_some())
            .cloned()
            .collect();

        let mut attempts = Vec::new();
        for definition in definitions {
            debug!("Searching for segment definition {}", definition.name);
            traces.dump_distances(track.name(), definition, &fixed)?;

            let start_candidates =
                find_candidates(&fixed, definition.start().position(), self.config.threshold);
            if start_candidates.is_empty() {
                debug!("None found, segment not started");
                continue;
            }

            let stop_candidates =
                find_candidates(&fixed, definition.stop().position(), self.config.threshold);
            if stop_candidates.is_empty() {
                debug!("None found, segment not stopped");
                continue;
            }

            let challenges =
                get_challenges(&start_candidates, &stop_candidates, self.config.cluster_gap);
            debug!("Found {} attempt(s) for this segment", challenges.len());

            for (virtual_start, virtual_stop) in challenges {
                let start = virtual_start.track_point;
                let stop = virtual_stop.track_point;
                let duration = stop.timestamp - start.timestamp;

                if virtual_stop.index_in_track <= virtual_start.index_in_track {
                    warn!(
                        "{}: skipping degenerate attempt on {} ({} -> {})",
                        track.name(),
                        definition.name,
                        virtual_start.index_in_track,
                        virtual_stop.index_in_track
                    );
                    continue;
                }
                let span = &fixed[virtual_start.index_in_track..=virtual_stop.index_in_track];

                let too_short = duration < MIN_ATTEMPT_DURATION;
                if too_short {
                    warn!(
                        "{}: attempt on {} lasts {}, recorded without metrics",
                        track.name(),
                        definition.name,
                        duration
                    );
                }
                let metric = |channel: Channel| {
                    if too_short {
                        Ok(None)
                    } else {
                        compute_metric(channel, span)
                    }
                };

                let distance_km = match (start.distance, stop.distance) {
                    (Some(from), Some(to)) => (to - from) / 1000.0,
                    _ => {
                        debug!(
                            "{}: no cumulative distance at the gates of {}, recording 0 km",
                            track.name(),
                            definition.name
                        );
                        0.0
                    }
                };

                if definition.debug {
                    traces.record_debug(definition, track.name(), start, stop)?;
                }
                traces.record_timing(definition, track.name(), distance_km, duration)?;

                info!(
                    "{} : {} found {:.2} km / {}",
                    track.name(),
                    definition.name,
                    distance_km,
                    duration
                );
                debug!("Start: {:?}\nStop {:?}", start, stop);

                attempts.push(Attempt {
                    segment_uid: definition.uid().to_string(),
                    segment_name: definition.name.clone(),
                    activity_name: track.name().to_string(),
                    start_time: start.timestamp,
                    duration,
                    distance_km,
                    heart_rate: metric(Channel::HeartRate)?,
                    cadence: metric(Channel::Cadence)?,
                    speed: metric(Channel::Speed)?,
                    temperature: metric(Channel::Temperature)?,
                });
            }
        }

        Ok(attempts)
    }
}
