//! Heading and turning angle on a filtered track.
//!
//! The heading of a fix is measured from its original predecessor (the
//! `prev` recorded at step derivation). The turning angle looks back to the
//! preceding *retained* fix, which after filtering may not be the original
//! predecessor; [`TurnPolicy::ContiguousOnly`] refuses to look across such gaps.

use crate::geo_utils::{planar_heading, turn_angle};
use crate::{DerivedTrack, TurnPolicy};

/// Fill `heading_rad` and `turn_angle_rad` for every fix of a filtered track.
///
/// Fixes without a predecessor get neither. A fix whose retained predecessor
/// has no heading gets a heading but no turning angle.
pub fn derive_headings(track: &mut DerivedTrack, policy: TurnPolicy) {
    // (seq, heading) of the previous retained fix
    let mut previous: Option<(usize, Option<f64>)> = None;

    for fix in track.fixes.iter_mut() {
        let point = fix.fix.point();
        let heading = fix.prev.map(|prev| planar_heading(&prev.point(), &point));

        fix.heading_rad = heading;
        fix.turn_angle_rad = match (previous, heading) {
            (Some((prev_seq, Some(prev_heading))), Some(heading)) => {
                let contiguous = prev_seq + 1 == fix.seq;
                if policy == TurnPolicy::ContiguousOnly && !contiguous {
                    None
                } else {
                    Some(turn_angle(prev_heading, heading))
                }
            }
            _ => None,
        };

        previous = Some((fix.seq, heading));
    }
}
