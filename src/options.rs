use bitflags::bitflags;

/// Creation options for [`crate::Dataset`]
#[derive(Debug, Clone, Copy)]
pub struct DatasetOptions {
    pub open_flags: OpenFlags,
    /// Native block size of every band, `(width, 1)` scanlines when unset.
    pub block_size: Option<(usize, usize)>,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        DatasetOptions {
            open_flags: OpenFlags::UPDATE,
            block_size: None,
        }
    }
}

bitflags! {
    /// Access flags of a [`crate::Dataset`] handle.
    ///
    /// Handles without [`OpenFlags::UPDATE`] refuse pixel writes with
    /// [`crate::errors::RasterError::ReadOnly`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open in read-only mode (default).
        const READONLY = 0x00;
        /// Open in update mode.
        const UPDATE = 0x01;
    }
}

impl Default for OpenFlags {
    fn default() -> OpenFlags {
        OpenFlags::READONLY
    }
}
