use async_trait::async_trait;

use crate::Hash;

/// Read-only view of the roots a pinner protects.
///
/// The garbage collector only needs these three snapshots to compute the
/// live set, so it depends on this trait instead of a concrete pinner.
#[async_trait]
pub trait PinRoots: Send + Sync {
    /// Keys pinned together with all their descendants.
    async fn recursive_keys(&self) -> Vec<Hash>;

    /// Keys pinned on their own, without descendants.
    async fn direct_keys(&self) -> Vec<Hash>;

    /// Keys the pinner itself depends on. Always treated as recursive roots.
    async fn internal_pins(&self) -> Vec<Hash>;
}

#[async_trait]
impl<T: PinRoots + ?Sized> PinRoots for std::sync::Arc<T> {
    async fn recursive_keys(&self) -> Vec<Hash> {
        (**self).recursive_keys().await
    }

    async fn direct_keys(&self) -> Vec<Hash> {
        (**self).direct_keys().await
    }

    async fn internal_pins(&self) -> Vec<Hash> {
        (**self).internal_pins().await
    }
}
