//! GPU command front end
//!
//! GP0 receives a stream of words which is reassembled into complete drawing
//! and configuration commands. GP1 commands are always a single word and
//! control the display. Rasterization is the job of the [`Renderer`].

mod commands;
pub mod renderer;

pub use renderer::{
    Color, FillRect, ImageLoad, Line, NullRenderer, Polygon, PolygonTexture, RecordingRenderer,
    Rectangle, RectangleTexture, RenderCommand, Renderer, TexCoord, Vertex,
};

use crate::config::UnimplementedPolicy;
use crate::error::Result;
use arrayvec::ArrayVec;
use commands::{Gp0Command, GP0_COMMANDS, GP1_COMMANDS};
use log::debug;

/// Longest GP0 command: shaded, textured quad
pub const MAX_COMMAND_WORDS: usize = 12;

/// What GP0 does with incoming words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gp0Mode {
    /// Words are commands and their arguments
    Command,
    /// Words are pixel data for a pending image load
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    Off = 0,
    Fifo = 1,
    CpuToGp0 = 2,
    VramToCpu = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDepth {
    T4Bit = 0,
    T8Bit = 1,
    T15Bit = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Top = 1,
    Bottom = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalRes {
    Y240Lines = 0,
    Y480Lines = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMode {
    Ntsc = 0,
    Pal = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayDepth {
    D15Bits = 0,
    D24Bits = 1,
}

/// Horizontal resolution as stored in GPUSTAT bits [18:16]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizontalRes(u8);

impl HorizontalRes {
    /// `hr1` is the 2bit field, `hr2` selects the 368 pixel mode
    pub fn from_fields(hr1: u8, hr2: u8) -> HorizontalRes {
        HorizontalRes((hr2 & 1) | ((hr1 & 3) << 1))
    }

    pub fn into_status(self) -> u32 {
        (self.0 as u32) << 16
    }
}

pub struct Gpu {
    renderer: Box<dyn Renderer>,
    policy: UnimplementedPolicy,

    // GP0 command assembly
    mode: Gp0Mode,
    /// Command waiting for its arguments
    queued: Option<Gp0Command>,
    /// Words still expected before the queued command (or image) is complete
    remaining: u32,
    arguments: ArrayVec<u32, MAX_COMMAND_WORDS>,
    image: Option<ImageLoad>,
    /// Value returned by GPUREAD
    gpu_read: u32,

    // Draw mode
    tex_page_x: u8,
    tex_page_y: u8,
    semi_transparency: u8,
    tex_depth: TextureDepth,
    dithering: bool,
    draw_to_display: bool,
    texture_disable: bool,
    rect_texture_x_flip: bool,
    rect_texture_y_flip: bool,

    tex_window_mask_x: u8,
    tex_window_mask_y: u8,
    tex_window_offset_x: u8,
    tex_window_offset_y: u8,

    draw_x1: u16,
    draw_y1: u16,
    draw_x2: u16,
    draw_y2: u16,
    draw_offset_x: i16,
    draw_offset_y: i16,

    force_set_mask_bit: bool,
    preserve_masked_pixels: bool,

    // Display
    field: Field,
    hres: HorizontalRes,
    vres: VerticalRes,
    video_mode: VideoMode,
    display_depth: DisplayDepth,
    interlaced: bool,
    display_disabled: bool,
    interrupt: bool,
    dma_direction: DmaDirection,

    display_x: u16,
    display_y: u16,
    display_x1: u16,
    display_x2: u16,
    display_y1: u16,
    display_y2: u16,
}

impl Gpu {
    pub fn new(renderer: Box<dyn Renderer>, policy: UnimplementedPolicy) -> Gpu {
        let mut gpu = Gpu {
            renderer,
            policy,
            mode: Gp0Mode::Command,
            queued: None,
            remaining: 0,
            arguments: ArrayVec::new(),
            image: None,
            gpu_read: 0,
            tex_page_x: 0,
            tex_page_y: 0,
            semi_transparency: 0,
            tex_depth: TextureDepth::T4Bit,
            dithering: false,
            draw_to_display: false,
            texture_disable: false,
            rect_texture_x_flip: false,
            rect_texture_y_flip: false,
            tex_window_mask_x: 0,
            tex_window_mask_y: 0,
            tex_window_offset_x: 0,
            tex_window_offset_y: 0,
            draw_x1: 0,
            draw_y1: 0,
            draw_x2: 0,
            draw_y2: 0,
            draw_offset_x: 0,
            draw_offset_y: 0,
            force_set_mask_bit: false,
            preserve_masked_pixels: false,
            field: Field::Top,
            hres: HorizontalRes::from_fields(0, 0),
            vres: VerticalRes::Y240Lines,
            video_mode: VideoMode::Ntsc,
            display_depth: DisplayDepth::D15Bits,
            interlaced: true,
            display_disabled: true,
            interrupt: false,
            dma_direction: DmaDirection::Off,
            display_x: 0,
            display_y: 0,
            display_x1: 0,
            display_x2: 0,
            display_y1: 0,
            display_y2: 0,
        };

        gpu.reset();

        gpu
    }

    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }

    pub fn mode(&self) -> Gp0Mode {
        self.mode
    }

    /// Words the pending command or image load still needs
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn draw_offset(&self) -> (i16, i16) {
        (self.draw_offset_x, self.draw_offset_y)
    }

    /// Drawing area as (left, top, right, bottom)
    pub fn drawing_area(&self) -> (u16, u16, u16, u16) {
        (self.draw_x1, self.draw_y1, self.draw_x2, self.draw_y2)
    }

    pub fn display_start(&self) -> (u16, u16) {
        (self.display_x, self.display_y)
    }

    pub fn horizontal_range(&self) -> (u16, u16) {
        (self.display_x1, self.display_x2)
    }

    pub fn vertical_range(&self) -> (u16, u16) {
        (self.display_y1, self.display_y2)
    }

    /// GP1(0x00) state
    fn reset(&mut self) {
        self.interrupt = false;

        self.tex_page_x = 0;
        self.tex_page_y = 0;
        self.semi_transparency = 0;
        self.tex_depth = TextureDepth::T4Bit;
        self.tex_window_mask_x = 0;
        self.tex_window_mask_y = 0;
        self.tex_window_offset_x = 0;
        self.tex_window_offset_y = 0;
        self.dithering = false;
        self.draw_to_display = false;
        self.texture_disable = false;
        self.rect_texture_x_flip = false;
        self.rect_texture_y_flip = false;
        self.draw_x1 = 0;
        self.draw_y1 = 0;
        self.draw_x2 = 0;
        self.draw_y2 = 0;
        self.draw_offset_x = 0;
        self.draw_offset_y = 0;
        self.force_set_mask_bit = false;
        self.preserve_masked_pixels = false;

        self.dma_direction = DmaDirection::Off;

        self.display_disabled = true;
        self.display_x = 0;
        self.display_y = 0;
        self.display_x1 = 0x200;
        self.display_x2 = 0xc00;
        self.display_y1 = 0x10;
        self.display_y2 = 0x100;
        self.hres = HorizontalRes::from_fields(0, 0);
        self.vres = VerticalRes::Y240Lines;
        self.video_mode = VideoMode::Ntsc;
        self.interlaced = true;
        self.display_depth = DisplayDepth::D15Bits;

        self.clear_command_buffer();
    }

    fn clear_command_buffer(&mut self) {
        self.arguments.clear();
        self.queued = None;
        self.remaining = 0;
        self.image = None;
        self.mode = Gp0Mode::Command;
    }

    /// GPUSTAT
    pub fn status(&self) -> u32 {
        let mut r = 0u32;

        r |= self.tex_page_x as u32;
        r |= (self.tex_page_y as u32) << 4;
        r |= (self.semi_transparency as u32) << 5;
        r |= (self.tex_depth as u32) << 7;
        r |= (self.dithering as u32) << 9;
        r |= (self.draw_to_display as u32) << 10;
        r |= (self.force_set_mask_bit as u32) << 11;
        r |= (self.preserve_masked_pixels as u32) << 12;
        r |= (self.field as u32) << 13;
        r |= (self.texture_disable as u32) << 15;
        r |= self.hres.into_status();
        // Bit 19 (vertical resolution) is left clear, the BIOS would
        // otherwise wait for the interlace field to toggle
        r |= (self.video_mode as u32) << 20;
        r |= (self.display_depth as u32) << 21;
        r |= (self.interlaced as u32) << 22;
        r |= (self.display_disabled as u32) << 23;
        r |= (self.interrupt as u32) << 24;

        // Always ready for commands, VRAM reads and DMA blocks
        r |= 1 << 26;
        r |= 1 << 27;
        r |= 1 << 28;

        r |= (self.dma_direction as u32) << 29;

        let dma_request = match self.dma_direction {
            DmaDirection::Off => 0,
            DmaDirection::Fifo => 1,
            DmaDirection::CpuToGp0 => (r >> 28) & 1,
            DmaDirection::VramToCpu => (r >> 27) & 1,
        };

        r | (dma_request << 25)
    }

    /// GPUREAD
    pub fn read(&self) -> u32 {
        self.gpu_read
    }

    /// GP0 write
    pub fn gp0(&mut self, word: u32) -> Result<()> {
        if self.mode == Gp0Mode::Image {
            if let Some(image) = self.image.as_mut() {
                image.data.push(word);
            }

            self.remaining -= 1;

            if self.remaining == 0 {
                self.mode = Gp0Mode::Command;

                if let Some(image) = self.image.take() {
                    self.renderer.load_image(&image);
                }
            }

            return Ok(());
        }

        let command = match self.queued {
            Some(c) => c,
            None => {
                let c = GP0_COMMANDS[(word >> 24) as usize];
                self.queued = Some(c);
                self.remaining = c.words as u32;
                c
            }
        };

        self.arguments.push(word);
        self.remaining -= 1;

        if self.remaining == 0 {
            self.queued = None;

            let arguments = std::mem::take(&mut self.arguments);
            let result = (command.handler)(self, &arguments);

            self.arguments = arguments;
            self.arguments.clear();

            return result;
        }

        Ok(())
    }

    /// GP1 write
    pub fn gp1(&mut self, word: u32) -> Result<()> {
        let command = GP1_COMMANDS[(word >> 24) as usize];

        debug!("GP1 {:08x} ({})", word, command.name);

        (command.handler)(self, word)
    }
}
