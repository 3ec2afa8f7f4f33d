pub mod descriptor;
pub mod provisioner;
pub mod resolver;

pub use descriptor::{BundleRef, FieldBindingDescriptor, FieldDeclaration};
pub use provisioner::{FieldProvisioner, ProvisionRequest};
pub use resolver::{FieldOption, FieldResolver};
