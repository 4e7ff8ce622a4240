use ::color::ColorType;

#[derive(Debug, Fail)]
pub enum RenderError {
    #[fail(display = "Attachment size {}x{} does not match framebuffer size {}x{}", _0, _1, _2, _3)]
    AttachmentSizeMismatch(u16, u16, u16, u16),
    #[fail(display = "{:?} is not usable as a {} attachment", _0, _1)]
    UnsupportedAttachmentFormat(ColorType, &'static str),
    #[fail(display = "Texture allocation of {} bytes failed", _0)]
    TextureAllocationFailed(usize),
    #[fail(display = "Window buffer storage unavailable")]
    WindowBufferUnavailable,
    #[fail(display = "Pipeline requires a depth buffer but the framebuffer has none")]
    MissingDepthBuffer,
    #[fail(display = "Fragment bins cannot be drained; the processor pool is corrupted")]
    BinOverflowStalled,
    #[fail(display = "Invalid {} handle {}", _0, _1)]
    InvalidHandle(&'static str, usize),
    #[fail(display = "Framebuffer has no attachments")]
    EmptyFramebuffer,
    #[fail(display = "Invalid pipeline state: {}", _0)]
    InvalidPipelineState(&'static str),
    #[fail(display = "Invalid texture extent {}x{}x{}", _0, _1, _2)]
    InvalidTextureExtent(u16, u16, u16),
    #[fail(display = "Presentation surface failure: {}", _0)]
    PlatformFailure(&'static str),
}

pub type RenderResult<T> = Result<T, RenderError>;
