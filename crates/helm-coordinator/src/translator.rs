//! Address translation between the coordinator's view and a participant's
//! local view.

use helm_core::{Operation, PathAddress};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Rewrites addresses for one participant.
///
/// Implementations must be deterministic: the output depends only on the
/// input address and the translator's own configuration.
pub trait AddressTranslator: fmt::Debug + Send + Sync {
    /// Participant-local form of `address`
    fn translate(&self, address: &PathAddress) -> PathAddress;
}

/// Leaves addresses unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl AddressTranslator for IdentityTranslator {
    fn translate(&self, address: &PathAddress) -> PathAddress {
        address.clone()
    }
}

/// Strips the participant's mount point from addresses below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPrefixTranslator {
    mount: PathAddress,
}

impl MountPrefixTranslator {
    /// Translator for a participant mounted at `mount`,
    /// e.g. `/host=primary/server=s1`
    pub fn new(mount: PathAddress) -> Self {
        Self { mount }
    }

    /// Mount point
    pub fn mount(&self) -> &PathAddress {
        &self.mount
    }
}

impl AddressTranslator for MountPrefixTranslator {
    fn translate(&self, address: &PathAddress) -> PathAddress {
        address
            .strip_prefix(&self.mount)
            .unwrap_or_else(|| address.clone())
    }
}

/// Apply `translator` to `operation`.
///
/// Returns the same `Arc` when the address does not change.
pub fn translate_operation(
    translator: &dyn AddressTranslator,
    operation: Arc<Operation>,
) -> Arc<Operation> {
    let translated = translator.translate(operation.address());
    if &translated == operation.address() {
        return operation;
    }
    trace!(from = %operation.address(), to = %translated, "Translated operation address");
    Arc::new(operation.with_address(translated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_core::operation::names;

    fn addr(text: &str) -> PathAddress {
        text.parse().unwrap()
    }

    #[test]
    fn mount_prefix_is_stripped_below_the_mount_only() {
        let translator = MountPrefixTranslator::new(addr("/host=primary/server=s1"));
        assert_eq!(
            translator.translate(&addr("/host=primary/server=s1/subsystem=web")),
            addr("/subsystem=web")
        );
        assert_eq!(translator.translate(&addr("/host=primary/server=s1")), PathAddress::root());
        assert_eq!(
            translator.translate(&addr("/host=primary/server=s2/subsystem=web")),
            addr("/host=primary/server=s2/subsystem=web")
        );
    }

    #[test]
    fn unchanged_addresses_reuse_the_operation() {
        let op = Arc::new(Operation::new(names::ADD, addr("/subsystem=web")).unwrap());
        let same = translate_operation(&IdentityTranslator, op.clone());
        assert!(Arc::ptr_eq(&same, &op));

        let outside = translate_operation(&MountPrefixTranslator::new(addr("/host=h")), op.clone());
        assert!(Arc::ptr_eq(&outside, &op));

        let mounted = Arc::new(Operation::new(names::ADD, addr("/host=h/subsystem=web")).unwrap());
        let stripped = translate_operation(&MountPrefixTranslator::new(addr("/host=h")), mounted.clone());
        assert!(!Arc::ptr_eq(&stripped, &mounted));
        assert_eq!(stripped.address(), &addr("/subsystem=web"));
        assert_eq!(stripped.id(), mounted.id());
    }
}
