//! Per-`Category` admission control (spec §4.4), generalizing
//! `AudioSystem::start_playback`'s concrete `bus_limits`/`max_voices`
//! instance-stealing logic into the full `InstanceBehavior` policy set.

use bank_schema::{Category, InstanceBehavior};

/// One currently-playing instance tracked against a category's
/// `max_instances` limit.
#[derive(Debug, Clone, Copy)]
pub struct ActiveEntry {
    pub handle: u64,
    pub order: u64,
    pub priority: u8,
    pub volume_linear: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    Allow,
    Replace(u64),
    Reject,
}

/// Decides whether a new instance with `new_priority` may start playing in
/// `category`, given the category's currently active instances.
pub fn admit(category: &Category, active: &[ActiveEntry], new_priority: u8) -> AdmitDecision {
    if active.len() < category.max_instances as usize {
        return AdmitDecision::Allow;
    }
    match category.instance_behavior {
        InstanceBehavior::FailNew => AdmitDecision::Reject,
        InstanceBehavior::ReplaceOldest => {
            let oldest = active.iter().min_by_key(|e| e.order);
            match oldest {
                Some(e) => AdmitDecision::Replace(e.handle),
                None => AdmitDecision::Allow,
            }
        }
        InstanceBehavior::ReplaceQuietest => {
            let quietest = active
                .iter()
                .min_by(|a, b| a.volume_linear.total_cmp(&b.volume_linear));
            match quietest {
                Some(e) => AdmitDecision::Replace(e.handle),
                None => AdmitDecision::Allow,
            }
        }
        InstanceBehavior::ReplaceLowestPriority => {
            let lowest = active
                .iter()
                .min_by(|a, b| a.priority.cmp(&b.priority).then(a.order.cmp(&b.order)));
            match lowest {
                Some(e) if new_priority > e.priority => AdmitDecision::Replace(e.handle),
                Some(_) => AdmitDecision::Reject,
                None => AdmitDecision::Allow,
            }
        }
    }
}
