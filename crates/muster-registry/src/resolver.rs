use muster_core::{Patch, Registration};

use crate::notifier::Delivery;

/// Seeds a newly registered instance with the providers that already exist.
///
/// Without this a dependent that starts after its providers would only ever
/// learn about future changes.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Builds the bootstrap patch for `new_reg` from `registered`.
    ///
    /// Sent even when no provider matches, but only to instances that declare
    /// at least one dependency and have an update URL; `None` otherwise. The
    /// instance itself is never listed.
    pub fn seed(new_reg: &Registration, registered: &[Registration]) -> Option<Delivery> {
        if new_reg.required_services.is_empty() || new_reg.service_update_url.is_empty() {
            return None;
        }

        let added = registered
            .iter()
            .filter(|reg| reg.service_url != new_reg.service_url)
            .filter(|reg| new_reg.depends_on(&reg.service_name))
            .map(Registration::entry)
            .collect();

        tracing::debug!(consumer = %new_reg.service_url, "seeding new registration with current providers");
        Some(Delivery {
            consumer: new_reg.service_url.clone(),
            target: new_reg.service_update_url.clone(),
            patch: Patch::added(added),
        })
    }
}
