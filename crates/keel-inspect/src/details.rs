//! Proxy target/handler extraction

use std::rc::Rc;

use keel_shared::SharedState;
use keel_value::{Object, ProxyDetails};

/// Source of a proxy's target and handler
pub trait ProxyDetailExtractor {
    /// `None` when `object` is not a proxy or its details are unavailable
    fn details(&self, object: &Object) -> Option<ProxyDetails>;
}

/// Extractor memoizing per object identity in the shared state
pub struct CachedProxyDetails {
    shared: Rc<SharedState>,
}

impl CachedProxyDetails {
    pub fn new(shared: Rc<SharedState>) -> Self {
        Self { shared }
    }
}

impl ProxyDetailExtractor for CachedProxyDetails {
    fn details(&self, object: &Object) -> Option<ProxyDetails> {
        self.shared
            .memoize
            .proxy_details
            .get_or_insert_with(object, || object.proxy_details())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_shared::{BasicHost, VersionedKey};

    #[test]
    fn test_details_are_memoized() {
        let shared = SharedState::new(VersionedKey::new("keel", "0.0.0"), BasicHost::new());
        let extractor = CachedProxyDetails::new(shared.clone());
        let target = Object::plain();
        let proxy = Object::proxy(target.clone(), Object::plain());
        let details = extractor.details(&proxy).unwrap();
        assert!(details.target.ptr_eq(&target));
        assert!(extractor.details(&Object::plain()).is_none());
        assert_eq!(shared.memoize.proxy_details.len(), 2);
        extractor.details(&proxy);
        assert_eq!(shared.memoize.proxy_details.len(), 2);
    }
}
