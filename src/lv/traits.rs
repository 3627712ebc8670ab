use crate::lv;

/// Anything that can be bound through a descriptor.
pub trait Resource {
    fn descriptor_info(&self) -> lv::DescriptorInfo;
}
