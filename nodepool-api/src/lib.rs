//! `nodepool.codefuture.io/v1alpha1` resource types.
//!
//! Plain serde data-transfer types matching the JSON the API server stores.
//! Empty optional fields are left out of the encoding.

pub mod binding;
pub mod meta;
pub mod nodepool;

pub use binding::{NodePoolBinding, NodePoolBindingList, NodePoolBindingSpec, NodePoolBindingStatus};
pub use meta::{ListMeta, ObjectMeta, TypeMeta};
pub use nodepool::{
    NodeDetail, NodePool, NodePoolCapacity, NodePoolList, NodePoolSpec, NodePoolStatus,
    NodeSchedulingState,
};

pub const GROUP: &str = "nodepool.codefuture.io";
pub const VERSION: &str = "v1alpha1";

/// `group/version` as written in `apiVersion`.
pub fn api_version() -> String {
    format!("{}/{}", GROUP, VERSION)
}

/// A kind served under [`GROUP`]/[`VERSION`].
pub trait Resource {
    const KIND: &'static str;

    fn type_meta() -> TypeMeta {
        TypeMeta {
            api_version: api_version(),
            kind: Self::KIND.to_string(),
        }
    }
}
