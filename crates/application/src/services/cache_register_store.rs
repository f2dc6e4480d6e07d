use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;
use traffic_router_domain::CacheRegister;

/// Holds the published cache register. Readers take a snapshot without
/// locking; a publish replaces the whole register at once.
pub struct CacheRegisterStore {
    current: ArcSwap<CacheRegister>,
}

impl CacheRegisterStore {
    pub fn new(register: CacheRegister) -> Self {
        Self {
            current: ArcSwap::from_pointee(register),
        }
    }

    pub fn empty() -> Self {
        Self::new(CacheRegister::default())
    }

    pub fn load(&self) -> Arc<CacheRegister> {
        self.current.load_full()
    }

    pub fn publish(&self, register: CacheRegister) {
        info!(
            delivery_services = register.delivery_services().count(),
            caches = register.caches().count(),
            locations = register.cache_locations().count(),
            "Cache register published"
        );
        self.current.store(Arc::new(register));
    }
}

impl Default for CacheRegisterStore {
    fn default() -> Self {
        Self::empty()
    }
}
