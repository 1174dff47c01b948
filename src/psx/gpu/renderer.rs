//! Interface to the rasterizer
//!
//! The GPU front end decodes GP0 commands into the typed primitives below
//! and hands them to a [`Renderer`]. What happens next (drawing to VRAM,
//! presenting a window) is up to the implementation.

use arrayvec::ArrayVec;
use log::trace;
use std::cell::RefCell;
use std::rc::Rc;

/// Vertex position, packed in GP0 words as `yyyyxxxx`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
}

impl Vertex {
    pub fn new(x: i16, y: i16) -> Vertex {
        Vertex { x, y }
    }

    pub fn from_gp0(word: u32) -> Vertex {
        Vertex {
            x: word as u16 as i16,
            y: (word >> 16) as u16 as i16,
        }
    }
}

/// 24bit color, packed in GP0 words as `..bbggrr`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }

    pub fn from_gp0(word: u32) -> Color {
        Color {
            r: word as u8,
            g: (word >> 8) as u8,
            b: (word >> 16) as u8,
        }
    }
}

/// Texture coordinate within the current texture page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexCoord {
    pub u: u8,
    pub v: u8,
}

impl TexCoord {
    pub fn from_gp0(word: u32) -> TexCoord {
        TexCoord {
            u: word as u8,
            v: (word >> 8) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolygonTexture {
    pub coords: ArrayVec<TexCoord, 4>,
    /// CLUT location, from the first texture word
    pub clut: u16,
    /// Texture page attributes, from the second texture word
    pub page: u16,
    /// Texture is not modulated by the vertex colors
    pub raw: bool,
}

/// Triangle or quadrilateral. Vertices are in GP0 order, a quad is drawn as
/// the triangles (0, 1, 2) and (1, 2, 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    pub vertices: ArrayVec<Vertex, 4>,
    pub colors: ArrayVec<Color, 4>,
    pub texture: Option<PolygonTexture>,
    pub semi_transparent: bool,
}

impl Polygon {
    pub fn is_quad(&self) -> bool {
        self.vertices.len() == 4
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub vertices: [Vertex; 2],
    pub colors: [Color; 2],
    pub semi_transparent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectangleTexture {
    pub coord: TexCoord,
    pub clut: u16,
    pub raw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub position: Vertex,
    pub width: u16,
    pub height: u16,
    pub color: Color,
    pub texture: Option<RectangleTexture>,
    pub semi_transparent: bool,
}

/// VRAM fill, ignores the drawing area and offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub color: Color,
}

/// CPU to VRAM upload: two 16bit pixels per word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLoad {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub data: Vec<u32>,
}

pub trait Renderer {
    fn draw_polygon(&mut self, polygon: &Polygon);

    fn draw_line(&mut self, line: &Line);

    fn draw_rectangle(&mut self, rectangle: &Rectangle);

    fn fill_rectangle(&mut self, fill: &FillRect);

    fn load_image(&mut self, image: &ImageLoad);

    fn set_draw_offset(&mut self, x: i16, y: i16);

    /// Pushes buffered primitives to the output
    fn flush(&mut self);

    /// Called once per CPU step. Must not block. Returns `false` when the
    /// user asked to quit.
    fn poll_events(&mut self) -> bool {
        true
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw_polygon(&mut self, polygon: &Polygon) {
        trace!("Polygon {:?}", polygon.vertices);
    }

    fn draw_line(&mut self, line: &Line) {
        trace!("Line {:?}", line.vertices);
    }

    fn draw_rectangle(&mut self, rectangle: &Rectangle) {
        trace!(
            "Rectangle {:?} {}x{}",
            rectangle.position,
            rectangle.width,
            rectangle.height
        );
    }

    fn fill_rectangle(&mut self, fill: &FillRect) {
        trace!("Fill {}x{} at {}x{}", fill.width, fill.height, fill.x, fill.y);
    }

    fn load_image(&mut self, image: &ImageLoad) {
        trace!("Image load {}x{} at {}x{}", image.width, image.height, image.x, image.y);
    }

    fn set_draw_offset(&mut self, x: i16, y: i16) {
        trace!("Draw offset {}x{}", x, y);
    }

    fn flush(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCommand {
    Polygon(Polygon),
    Line(Line),
    Rectangle(Rectangle),
    Fill(FillRect),
    LoadImage(ImageLoad),
    DrawOffset(i16, i16),
    Flush,
}

/// Records every call in a log shared between its clones, so the log can
/// still be inspected once the renderer has been handed to the GPU
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Rc<RefCell<Vec<RenderCommand>>>,
}

impl RecordingRenderer {
    pub fn new() -> RecordingRenderer {
        RecordingRenderer::default()
    }

    pub fn commands(&self) -> Vec<RenderCommand> {
        self.log.borrow().clone()
    }

    /// Drains the log
    pub fn take(&self) -> Vec<RenderCommand> {
        self.log.borrow_mut().drain(..).collect()
    }

    /// Drawing commands only, offsets and flushes are left out
    pub fn draws(&self) -> Vec<RenderCommand> {
        self.log
            .borrow()
            .iter()
            .filter(|c| !matches!(c, RenderCommand::DrawOffset(..) | RenderCommand::Flush))
            .cloned()
            .collect()
    }

    fn push(&self, command: RenderCommand) {
        self.log.borrow_mut().push(command);
    }
}

impl Renderer for RecordingRenderer {
    fn draw_polygon(&mut self, polygon: &Polygon) {
        self.push(RenderCommand::Polygon(polygon.clone()));
    }

    fn draw_line(&mut self, line: &Line) {
        self.push(RenderCommand::Line(line.clone()));
    }

    fn draw_rectangle(&mut self, rectangle: &Rectangle) {
        self.push(RenderCommand::Rectangle(*rectangle));
    }

    fn fill_rectangle(&mut self, fill: &FillRect) {
        self.push(RenderCommand::Fill(*fill));
    }

    fn load_image(&mut self, image: &ImageLoad) {
        self.push(RenderCommand::LoadImage(image.clone()));
    }

    fn set_draw_offset(&mut self, x: i16, y: i16) {
        self.push(RenderCommand::DrawOffset(x, y));
    }

    fn flush(&mut self) {
        self.push(RenderCommand::Flush);
    }
}
