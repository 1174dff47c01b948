//! GP0 and GP1 command tables
//!
//! GP0 opcodes 0x20 to 0x7f encode the primitive attributes in their bits,
//! the handlers decode them from the opcode word:
//!
//! | Bit | Polygon      | Line         | Rectangle           |
//! |-----|--------------|--------------|---------------------|
//! | 0   | raw texture  |              | raw texture         |
//! | 1   | semi-transp. | semi-transp. | semi-transp.        |
//! | 2   | textured     |              | textured            |
//! | 3   | quad         | polyline     | size (bits 3 and 4) |
//! | 4   | shaded       | shaded       |                     |

use super::renderer::{
    Color, FillRect, ImageLoad, Line, Polygon, PolygonTexture, Rectangle, RectangleTexture,
    TexCoord, Vertex,
};
use super::{
    DisplayDepth, DmaDirection, Gp0Mode, Gpu, HorizontalRes, TextureDepth, VerticalRes, VideoMode,
};
use crate::config::UnimplementedPolicy;
use crate::error::{PsxError, Result};
use arrayvec::ArrayVec;
use lazy_static::lazy_static;
use log::{debug, warn};

type Gp0Handler = fn(&mut Gpu, &[u32]) -> Result<()>;
type Gp1Handler = fn(&mut Gpu, u32) -> Result<()>;

#[derive(Clone, Copy)]
pub(super) struct Gp0Command {
    pub handler: Gp0Handler,
    /// Total length including the opcode word
    pub words: u8,
    pub name: &'static str,
}

#[derive(Clone, Copy)]
pub(super) struct Gp1Command {
    pub handler: Gp1Handler,
    pub name: &'static str,
}

lazy_static! {
    pub(super) static ref GP0_COMMANDS: [Gp0Command; 256] = gp0_table();
    pub(super) static ref GP1_COMMANDS: [Gp1Command; 256] = gp1_table();
}

fn gp0(handler: Gp0Handler, words: u8, name: &'static str) -> Gp0Command {
    Gp0Command {
        handler,
        words,
        name,
    }
}

fn gp1(handler: Gp1Handler, name: &'static str) -> Gp1Command {
    Gp1Command { handler, name }
}

fn polygon_words(op: usize) -> Option<u8> {
    let textured = op & 0x04 != 0;
    let vertices = if op & 0x08 != 0 { 4 } else { 3 };
    let shaded = op & 0x10 != 0;

    // The raw texture bit means nothing without a texture
    if op & 1 != 0 && !textured {
        return None;
    }

    let per_vertex = if textured { 2 } else { 1 };
    let colors = if shaded { vertices - 1 } else { 0 };

    Some(1 + vertices * per_vertex + colors)
}

fn rectangle_words(op: usize) -> Option<u8> {
    let textured = op & 0x04 != 0;
    let variable_size = (op >> 3) & 3 == 0;

    if op & 1 != 0 && !textured {
        return None;
    }

    Some(2 + textured as u8 + variable_size as u8)
}

fn gp0_table() -> [Gp0Command; 256] {
    let mut table = [gp0(gp0_unknown, 1, "unknown"); 256];

    table[0x00] = gp0(gp0_nop, 1, "nop");
    table[0x01] = gp0(gp0_nop, 1, "clear cache");
    table[0x02] = gp0(gp0_fill_rect, 3, "fill rectangle");

    for op in 0x20..=0x3f {
        if let Some(words) = polygon_words(op) {
            table[op] = gp0(gp0_polygon, words, "polygon");
        }
    }

    for op in 0x40..=0x5f {
        if op & 0x05 == 0 {
            let words = if op & 0x10 != 0 { 4 } else { 3 };
            table[op] = gp0(gp0_line, words, "line");
        }
    }

    for op in 0x60..=0x7f {
        if let Some(words) = rectangle_words(op) {
            table[op] = gp0(gp0_rectangle, words, "rectangle");
        }
    }

    table[0x80] = gp0(gp0_unknown, 4, "copy rectangle");
    table[0xa0] = gp0(gp0_load_image, 3, "load image");
    table[0xc0] = gp0(gp0_unknown, 3, "store image");

    table[0xe1] = gp0(gp0_draw_mode, 1, "draw mode");
    table[0xe2] = gp0(gp0_texture_window, 1, "texture window");
    table[0xe3] = gp0(gp0_drawing_area_top_left, 1, "drawing area top left");
    table[0xe4] = gp0(gp0_drawing_area_bottom_right, 1, "drawing area bottom right");
    table[0xe5] = gp0(gp0_drawing_offset, 1, "drawing offset");
    table[0xe6] = gp0(gp0_mask_bit, 1, "mask bit");

    table
}

fn gp1_table() -> [Gp1Command; 256] {
    let mut table = [gp1(gp1_unknown, "unknown"); 256];

    table[0x00] = gp1(gp1_reset, "reset");
    table[0x01] = gp1(gp1_reset_command_buffer, "reset command buffer");
    table[0x02] = gp1(gp1_acknowledge_irq, "acknowledge interrupt");
    table[0x03] = gp1(gp1_display_enable, "display enable");
    table[0x04] = gp1(gp1_dma_direction, "DMA direction");
    table[0x05] = gp1(gp1_display_vram_start, "display VRAM start");
    table[0x06] = gp1(gp1_display_horizontal_range, "horizontal display range");
    table[0x07] = gp1(gp1_display_vertical_range, "vertical display range");
    table[0x08] = gp1(gp1_display_mode, "display mode");

    for entry in &mut table[0x10..=0x1f] {
        *entry = gp1(gp1_get_info, "get GPU info");
    }

    table
}

// ============================================================================
// GP0
// ============================================================================

fn gp0_unknown(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let word = args[0];
    let name = GP0_COMMANDS[(word >> 24) as usize].name;

    match gpu.policy {
        UnimplementedPolicy::Halt => Err(PsxError::UnimplementedGp0(word)),
        UnimplementedPolicy::Exception => {
            warn!("Unimplemented GP0 command {:08x} ({})", word, name);
            Ok(())
        }
    }
}

fn gp0_nop(_: &mut Gpu, _: &[u32]) -> Result<()> {
    Ok(())
}

fn gp0_fill_rect(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let fill = FillRect {
        x: (args[1] & 0x3f0) as u16,
        y: ((args[1] >> 16) & 0x1ff) as u16,
        width: (((args[2] & 0x3ff) + 0xf) & !0xf) as u16,
        height: ((args[2] >> 16) & 0x1ff) as u16,
        color: Color::from_gp0(args[0]),
    };

    gpu.renderer.fill_rectangle(&fill);

    Ok(())
}

fn gp0_polygon(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let op = args[0] >> 24;
    let vertex_count = if op & 0x08 != 0 { 4 } else { 3 };
    let shaded = op & 0x10 != 0;
    let textured = op & 0x04 != 0;

    let mut words = args.iter().copied();
    let first = words.next().unwrap_or(0);

    let mut vertices = ArrayVec::new();
    let mut colors = ArrayVec::new();
    let mut coords = ArrayVec::new();
    let mut clut = 0;
    let mut page = 0;

    for v in 0..vertex_count {
        // Monochrome polygons reuse the opcode word color for every vertex
        let color = if shaded && v > 0 {
            words.next().unwrap_or(0)
        } else {
            first
        };

        colors.push(Color::from_gp0(color));
        vertices.push(Vertex::from_gp0(words.next().unwrap_or(0)));

        if textured {
            let t = words.next().unwrap_or(0);

            coords.push(TexCoord::from_gp0(t));

            match v {
                0 => clut = (t >> 16) as u16,
                1 => page = (t >> 16) as u16,
                _ => (),
            }
        }
    }

    let polygon = Polygon {
        vertices,
        colors,
        texture: textured.then(|| PolygonTexture {
            coords,
            clut,
            page,
            raw: op & 0x01 != 0,
        }),
        semi_transparent: op & 0x02 != 0,
    };

    gpu.renderer.draw_polygon(&polygon);

    Ok(())
}

fn gp0_line(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let op = args[0] >> 24;
    let shaded = op & 0x10 != 0;

    // Polylines are drawn as their first segment
    let (c1, v1) = if shaded {
        (args[2], args[3])
    } else {
        (args[0], args[2])
    };

    let line = Line {
        vertices: [Vertex::from_gp0(args[1]), Vertex::from_gp0(v1)],
        colors: [Color::from_gp0(args[0]), Color::from_gp0(c1)],
        semi_transparent: op & 0x02 != 0,
    };

    gpu.renderer.draw_line(&line);

    Ok(())
}

fn gp0_rectangle(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let op = args[0] >> 24;
    let textured = op & 0x04 != 0;

    let mut words = args[2..].iter().copied();

    let texture = if textured {
        let t = words.next().unwrap_or(0);

        Some(RectangleTexture {
            coord: TexCoord::from_gp0(t),
            clut: (t >> 16) as u16,
            raw: op & 0x01 != 0,
        })
    } else {
        None
    };

    let (width, height) = match (op >> 3) & 3 {
        0 => {
            let size = words.next().unwrap_or(0);
            ((size & 0x3ff) as u16, ((size >> 16) & 0x1ff) as u16)
        }
        1 => (1, 1),
        2 => (8, 8),
        _ => (16, 16),
    };

    let rectangle = Rectangle {
        position: Vertex::from_gp0(args[1]),
        width,
        height,
        color: Color::from_gp0(args[0]),
        texture,
        semi_transparent: op & 0x02 != 0,
    };

    gpu.renderer.draw_rectangle(&rectangle);

    Ok(())
}

fn vram_extent(size: u32, mask: u32) -> u32 {
    match size {
        0 => 0,
        n => ((n - 1) & mask) + 1,
    }
}

/// Switches GP0 to image mode for the pixel payload
fn gp0_load_image(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let position = args[1];
    let resolution = args[2];

    // Sizes wrap to the VRAM dimensions, zero stays zero
    let width = vram_extent(resolution & 0xffff, 0x3ff);
    let height = vram_extent(resolution >> 16, 0x1ff);

    // Two 16bit pixels per word, rounded up
    let words = (width * height + 1) / 2;

    if words == 0 {
        debug!("Empty image load");
        return Ok(());
    }

    gpu.image = Some(ImageLoad {
        x: (position & 0x3ff) as u16,
        y: ((position >> 16) & 0x1ff) as u16,
        width: width as u16,
        height: height as u16,
        data: Vec::with_capacity(words as usize),
    });

    gpu.remaining = words;
    gpu.mode = Gp0Mode::Image;

    Ok(())
}

fn gp0_draw_mode(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let v = args[0];

    gpu.tex_page_x = (v & 0xf) as u8;
    gpu.tex_page_y = ((v >> 4) & 1) as u8;
    gpu.semi_transparency = ((v >> 5) & 3) as u8;

    gpu.tex_depth = match (v >> 7) & 3 {
        0 => TextureDepth::T4Bit,
        1 => TextureDepth::T8Bit,
        _ => TextureDepth::T15Bit,
    };

    gpu.dithering = (v >> 9) & 1 != 0;
    gpu.draw_to_display = (v >> 10) & 1 != 0;
    gpu.texture_disable = (v >> 11) & 1 != 0;
    gpu.rect_texture_x_flip = (v >> 12) & 1 != 0;
    gpu.rect_texture_y_flip = (v >> 13) & 1 != 0;

    Ok(())
}

fn gp0_texture_window(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let v = args[0];

    gpu.tex_window_mask_x = (v & 0x1f) as u8;
    gpu.tex_window_mask_y = ((v >> 5) & 0x1f) as u8;
    gpu.tex_window_offset_x = ((v >> 10) & 0x1f) as u8;
    gpu.tex_window_offset_y = ((v >> 15) & 0x1f) as u8;

    Ok(())
}

fn gp0_drawing_area_top_left(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    gpu.draw_x1 = (args[0] & 0x3ff) as u16;
    gpu.draw_y1 = ((args[0] >> 10) & 0x3ff) as u16;

    Ok(())
}

fn gp0_drawing_area_bottom_right(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    gpu.draw_x2 = (args[0] & 0x3ff) as u16;
    gpu.draw_y2 = ((args[0] >> 10) & 0x3ff) as u16;

    Ok(())
}

fn gp0_drawing_offset(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    let v = args[0];

    // Two 11bit signed values
    let x = ((v << 21) as i32 >> 21) as i16;
    let y = ((v << 10) as i32 >> 21) as i16;

    gpu.draw_offset_x = x;
    gpu.draw_offset_y = y;

    gpu.renderer.set_draw_offset(x, y);
    gpu.renderer.flush();

    Ok(())
}

fn gp0_mask_bit(gpu: &mut Gpu, args: &[u32]) -> Result<()> {
    gpu.force_set_mask_bit = args[0] & 1 != 0;
    gpu.preserve_masked_pixels = args[0] & 2 != 0;

    Ok(())
}

// ============================================================================
// GP1
// ============================================================================

fn gp1_unknown(gpu: &mut Gpu, word: u32) -> Result<()> {
    match gpu.policy {
        UnimplementedPolicy::Halt => Err(PsxError::UnimplementedGp1(word)),
        UnimplementedPolicy::Exception => {
            warn!("Unimplemented GP1 command {:08x}", word);
            Ok(())
        }
    }
}

fn gp1_reset(gpu: &mut Gpu, _: u32) -> Result<()> {
    debug!("GPU reset");
    gpu.reset();

    Ok(())
}

fn gp1_reset_command_buffer(gpu: &mut Gpu, _: u32) -> Result<()> {
    gpu.clear_command_buffer();

    Ok(())
}

fn gp1_acknowledge_irq(gpu: &mut Gpu, _: u32) -> Result<()> {
    gpu.interrupt = false;

    Ok(())
}

fn gp1_display_enable(gpu: &mut Gpu, word: u32) -> Result<()> {
    gpu.display_disabled = word & 1 != 0;

    Ok(())
}

fn gp1_dma_direction(gpu: &mut Gpu, word: u32) -> Result<()> {
    gpu.dma_direction = match word & 3 {
        0 => DmaDirection::Off,
        1 => DmaDirection::Fifo,
        2 => DmaDirection::CpuToGp0,
        _ => DmaDirection::VramToCpu,
    };

    Ok(())
}

fn gp1_display_vram_start(gpu: &mut Gpu, word: u32) -> Result<()> {
    gpu.display_x = (word & 0x3fe) as u16;
    gpu.display_y = ((word >> 10) & 0x1ff) as u16;

    Ok(())
}

fn gp1_display_horizontal_range(gpu: &mut Gpu, word: u32) -> Result<()> {
    gpu.display_x1 = (word & 0xfff) as u16;
    gpu.display_x2 = ((word >> 12) & 0xfff) as u16;

    Ok(())
}

fn gp1_display_vertical_range(gpu: &mut Gpu, word: u32) -> Result<()> {
    gpu.display_y1 = (word & 0x3ff) as u16;
    gpu.display_y2 = ((word >> 10) & 0x3ff) as u16;

    Ok(())
}

fn gp1_display_mode(gpu: &mut Gpu, word: u32) -> Result<()> {
    let hr1 = (word & 3) as u8;
    let hr2 = ((word >> 6) & 1) as u8;

    gpu.hres = HorizontalRes::from_fields(hr1, hr2);

    gpu.vres = if word & 0x4 != 0 {
        VerticalRes::Y480Lines
    } else {
        VerticalRes::Y240Lines
    };

    gpu.video_mode = if word & 0x8 != 0 {
        VideoMode::Pal
    } else {
        VideoMode::Ntsc
    };

    gpu.display_depth = if word & 0x10 != 0 {
        DisplayDepth::D24Bits
    } else {
        DisplayDepth::D15Bits
    };

    gpu.interlaced = word & 0x20 != 0;

    if word & 0x80 != 0 {
        return match gpu.policy {
            UnimplementedPolicy::Halt => Err(PsxError::UnimplementedFeature("GPU reverse flag")),
            UnimplementedPolicy::Exception => {
                warn!("Unsupported GP1 display mode {:08x}", word);
                Ok(())
            }
        };
    }

    Ok(())
}

/// Latches a piece of internal state into GPUREAD
fn gp1_get_info(gpu: &mut Gpu, word: u32) -> Result<()> {
    gpu.gpu_read = match word & 0xf {
        2 => {
            (gpu.tex_window_mask_x as u32)
                | ((gpu.tex_window_mask_y as u32) << 5)
                | ((gpu.tex_window_offset_x as u32) << 10)
                | ((gpu.tex_window_offset_y as u32) << 15)
        }
        3 => (gpu.draw_x1 as u32) | ((gpu.draw_y1 as u32) << 10),
        4 => (gpu.draw_x2 as u32) | ((gpu.draw_y2 as u32) << 10),
        5 => {
            ((gpu.draw_offset_x as u32) & 0x7ff) | (((gpu.draw_offset_y as u32) & 0x7ff) << 11)
        }
        // GPU version
        7 => 2,
        _ => gpu.gpu_read,
    };

    Ok(())
}
