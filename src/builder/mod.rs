//! # Builders
//!
//! Pure constructors for the objects the controller writes: templates applied to
//! templated resources, provisioned instances and bindings, and republished
//! credential secrets. Nothing here touches a store.

pub mod binding;
pub mod instance;
pub mod owner;
pub mod secret;

pub use binding::{apply_binding_template, build_provisioned_binding, refresh_provisioned_binding};
pub use instance::{apply_instance_template, build_provisioned_instance, refresh_provisioned_instance};
pub use owner::{controller_name_of_kind, controller_of, controller_reference, is_controlled_by};
pub use secret::{
    bound_secret_name, build_shadow_secret, refresh_shadow_secret, rekey_secret_data,
    shadow_secret_name,
};
