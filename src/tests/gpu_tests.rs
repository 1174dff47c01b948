// GP0 command assembly and GP1 display control

use crate::config::UnimplementedPolicy;
use crate::error::PsxError;
use crate::psx::gpu::{
    Color, FillRect, Gp0Mode, Gpu, Line, Polygon, RecordingRenderer, RenderCommand, TexCoord,
    Vertex,
};

fn gpu() -> (Gpu, RecordingRenderer) {
    gpu_with(UnimplementedPolicy::Exception)
}

fn gpu_with(policy: UnimplementedPolicy) -> (Gpu, RecordingRenderer) {
    let renderer = RecordingRenderer::new();
    let gpu = Gpu::new(Box::new(renderer.clone()), policy);

    (gpu, renderer)
}

fn feed(gpu: &mut Gpu, words: &[u32]) {
    for &w in words {
        gpu.gp0(w).unwrap();
    }
}

fn only_polygon(renderer: &RecordingRenderer) -> Polygon {
    let draws = renderer.draws();
    assert_eq!(draws.len(), 1);

    match draws.into_iter().next() {
        Some(RenderCommand::Polygon(p)) => p,
        other => panic!("unexpected command {:?}", other),
    }
}

const MONO_QUAD: [u32; 5] = [
    0x2811_2233,
    0x0001_0002,
    0x0003_0004,
    0x0005_0006,
    0x0007_0008,
];

#[test]
fn test_monochrome_quad_needs_all_arguments() {
    let (mut gpu, renderer) = gpu();

    feed(&mut gpu, &MONO_QUAD[..4]);
    assert!(renderer.draws().is_empty());
    assert_eq!(gpu.remaining(), 1);

    feed(&mut gpu, &MONO_QUAD[4..]);

    let p = only_polygon(&renderer);
    let color = Color::new(0x33, 0x22, 0x11);

    assert_eq!(
        p.vertices.as_slice(),
        &[
            Vertex::new(2, 1),
            Vertex::new(4, 3),
            Vertex::new(6, 5),
            Vertex::new(8, 7),
        ]
    );
    assert_eq!(p.colors.as_slice(), &[color; 4]);
    assert!(p.texture.is_none());
    assert!(!p.semi_transparent);
    assert_eq!(gpu.remaining(), 0);
}

#[test]
fn test_shaded_triangle_word_order() {
    let (mut gpu, renderer) = gpu();

    feed(
        &mut gpu,
        &[
            0x3200_00ff,
            0x0000_0000,
            0x0000_ff00,
            0x0000_0010,
            0x00ff_0000,
            0x0010_0000,
        ],
    );

    let p = only_polygon(&renderer);

    assert!(!p.is_quad());
    assert!(p.semi_transparent);
    assert_eq!(
        p.colors.as_slice(),
        &[
            Color::new(0xff, 0, 0),
            Color::new(0, 0xff, 0),
            Color::new(0, 0, 0xff),
        ]
    );
    assert_eq!(p.vertices[2], Vertex::new(0, 0x10));
}

#[test]
fn test_textured_quad() {
    let (mut gpu, renderer) = gpu();

    feed(
        &mut gpu,
        &[
            0x2d80_8080,
            0x0000_0000,
            0x7fc0_0000,
            0x0000_0040,
            0x0014_003f,
            0x0040_0000,
            0x0000_3f00,
            0x0040_0040,
            0x0000_3f3f,
        ],
    );

    let p = only_polygon(&renderer);
    assert!(p.is_quad());

    let texture = p.texture.expect("textured");
    assert!(texture.raw);
    assert_eq!(texture.clut, 0x7fc0);
    assert_eq!(texture.page, 0x0014);
    assert_eq!(
        texture.coords.as_slice(),
        &[
            TexCoord { u: 0, v: 0 },
            TexCoord { u: 0x3f, v: 0 },
            TexCoord { u: 0, v: 0x3f },
            TexCoord { u: 0x3f, v: 0x3f },
        ]
    );
}

#[test]
fn test_lines() {
    let (mut gpu, renderer) = gpu();

    feed(&mut gpu, &[0x4000_00ff, 0x0000_0000, 0x0010_0010]);
    feed(&mut gpu, &[0x5200_0011, 0x0001_0001, 0x0000_2200, 0x0002_0002]);

    assert_eq!(
        renderer.draws(),
        vec![
            RenderCommand::Line(Line {
                vertices: [Vertex::new(0, 0), Vertex::new(0x10, 0x10)],
                colors: [Color::new(0xff, 0, 0); 2],
                semi_transparent: false,
            }),
            RenderCommand::Line(Line {
                vertices: [Vertex::new(1, 1), Vertex::new(2, 2)],
                colors: [Color::new(0x11, 0, 0), Color::new(0, 0x22, 0)],
                semi_transparent: true,
            }),
        ]
    );
}

#[test]
fn test_rectangles() {
    let (mut gpu, renderer) = gpu();

    // Variable size, monochrome
    feed(&mut gpu, &[0x6000_ff00, 0x0020_0010, 0x0030_0040]);
    // 16x16, textured
    feed(&mut gpu, &[0x7c80_8080, 0x0000_0000, 0x1234_0201]);

    let draws = renderer.draws();
    assert_eq!(draws.len(), 2);

    match (&draws[0], &draws[1]) {
        (RenderCommand::Rectangle(a), RenderCommand::Rectangle(b)) => {
            assert_eq!(a.position, Vertex::new(0x10, 0x20));
            assert_eq!((a.width, a.height), (0x40, 0x30));
            assert_eq!(a.color, Color::new(0, 0xff, 0));
            assert!(a.texture.is_none());

            let t = b.texture.expect("textured");
            assert_eq!((b.width, b.height), (16, 16));
            assert_eq!(t.coord, TexCoord { u: 1, v: 2 });
            assert_eq!(t.clut, 0x1234);
        }
        other => panic!("unexpected commands {:?}", other),
    }
}

#[test]
fn test_fill_rectangle() {
    let (mut gpu, renderer) = gpu();

    feed(&mut gpu, &[0x0200_00ff, 0x0010_0013, 0x0020_0011]);

    assert_eq!(
        renderer.draws(),
        vec![RenderCommand::Fill(FillRect {
            x: 0x10,
            y: 0x10,
            width: 0x20,
            height: 0x20,
            color: Color::new(0xff, 0, 0),
        })]
    );
}

#[test]
fn test_load_image_consumes_payload() {
    let (mut gpu, renderer) = gpu();

    // 3x3 pixels at 32x16: five words, the last one half used
    feed(&mut gpu, &[0xa000_0000, 0x0010_0020, 0x0003_0003]);
    assert_eq!(gpu.mode(), Gp0Mode::Image);
    assert_eq!(gpu.remaining(), 5);

    feed(&mut gpu, &[1, 2, 3, 4]);
    assert!(renderer.draws().is_empty());

    // The payload may look like commands, it is still pixel data
    feed(&mut gpu, &[0x2800_0000]);
    assert_eq!(gpu.mode(), Gp0Mode::Command);

    match renderer.draws().as_slice() {
        [RenderCommand::LoadImage(image)] => {
            assert_eq!((image.x, image.y), (0x20, 0x10));
            assert_eq!((image.width, image.height), (3, 3));
            assert_eq!(image.data, vec![1, 2, 3, 4, 0x2800_0000]);
        }
        other => panic!("unexpected commands {:?}", other),
    }

    // Back to command parsing
    feed(&mut gpu, &MONO_QUAD);
    assert_eq!(renderer.draws().len(), 2);
}

#[test]
fn test_oversized_image_load_wraps_to_vram() {
    let (mut gpu, renderer) = gpu();

    // 1026x514 wraps to 2x2
    feed(&mut gpu, &[0xa000_0000, 0, (514 << 16) | 1026]);
    assert_eq!(gpu.remaining(), 2);

    feed(&mut gpu, &[7, 8]);
    assert_eq!(gpu.mode(), Gp0Mode::Command);

    match renderer.draws().as_slice() {
        [RenderCommand::LoadImage(image)] => {
            assert_eq!((image.width, image.height), (2, 2));
            assert_eq!(image.data, vec![7, 8]);
        }
        other => panic!("unexpected commands {:?}", other),
    }

    // The largest request is bounded by the size of VRAM
    feed(&mut gpu, &[0xa000_0000, 0, 0xffff_ffff]);
    assert_eq!(gpu.remaining(), (1023 * 511 + 1) / 2);
}

#[test]
fn test_empty_image_load() {
    let (mut gpu, renderer) = gpu();

    feed(&mut gpu, &[0xa000_0000, 0x0000_0000, 0x0000_0000]);

    assert_eq!(gpu.mode(), Gp0Mode::Command);
    assert!(renderer.draws().is_empty());
}

#[test]
fn test_draw_settings() {
    let (mut gpu, renderer) = gpu();

    feed(
        &mut gpu,
        &[
            0xe300_0000 | (20 << 10) | 10,
            0xe400_0000 | (239 << 10) | 319,
            0xe500_0000 | (3 << 11) | (-5i32 as u32 & 0x7ff),
        ],
    );

    assert_eq!(gpu.drawing_area(), (10, 20, 319, 239));
    assert_eq!(gpu.draw_offset(), (-5, 3));
    assert_eq!(
        renderer.commands(),
        vec![RenderCommand::DrawOffset(-5, 3), RenderCommand::Flush]
    );
}

#[test]
fn test_draw_mode_in_status() {
    let (mut gpu, _) = gpu();

    // Page 3/1, 8bit texture, dithering, draw to display
    feed(&mut gpu, &[0xe100_0000 | 0x3 | 0x10 | (1 << 7) | (1 << 9) | (1 << 10)]);
    feed(&mut gpu, &[0xe600_0003]);

    let status = gpu.status();

    assert_eq!(status & 0x7ff, 0x3 | 0x10 | (1 << 7) | (1 << 9) | (1 << 10));
    assert_ne!(status & (1 << 11), 0);
    assert_ne!(status & (1 << 12), 0);
}

#[test]
fn test_reset_status() {
    let (gpu, _) = gpu();

    // Field, interlace, display disabled and the ready bits
    assert_eq!(gpu.status(), 0x1cc0_2000);
    assert_eq!(gpu.horizontal_range(), (0x200, 0xc00));
    assert_eq!(gpu.vertical_range(), (0x10, 0x100));
}

#[test]
fn test_dma_request_bit_follows_direction() {
    let (mut gpu, _) = gpu();

    for (direction, request) in [(0, 0), (1, 1), (2, 1), (3, 1)] {
        gpu.gp1(0x0400_0000 | direction).unwrap();

        let status = gpu.status();

        assert_eq!((status >> 29) & 3, direction);
        assert_eq!((status >> 25) & 1, request, "direction {}", direction);
    }
}

#[test]
fn test_clear_command_buffer() {
    let (mut gpu, renderer) = gpu();

    feed(&mut gpu, &MONO_QUAD[..3]);
    gpu.gp1(0x0100_0000).unwrap();
    assert_eq!(gpu.remaining(), 0);

    feed(&mut gpu, &MONO_QUAD);
    assert_eq!(only_polygon(&renderer).vertices[0], Vertex::new(2, 1));
}

#[test]
fn test_reset_drops_image_load() {
    let (mut gpu, renderer) = gpu();

    feed(&mut gpu, &[0xa000_0000, 0, 0x0002_0002, 1]);
    gpu.gp1(0x0000_0000).unwrap();

    assert_eq!(gpu.mode(), Gp0Mode::Command);

    feed(&mut gpu, &[2]);
    assert!(renderer.draws().is_empty());
}

#[test]
fn test_display_control() {
    let (mut gpu, _) = gpu();

    gpu.gp1(0x0300_0000).unwrap();
    gpu.gp1(0x0500_0000 | (0x100 << 10) | 0x2ff).unwrap();
    gpu.gp1(0x0600_0000 | (0xc60 << 12) | 0x260).unwrap();
    gpu.gp1(0x0700_0000 | (0x100 << 10) | 0x10).unwrap();
    // 320 pixels, PAL, 24 bit, interlaced
    gpu.gp1(0x0800_0000 | 0x1 | 0x8 | 0x10 | 0x20).unwrap();

    assert_eq!(gpu.display_start(), (0x2fe, 0x100));
    assert_eq!(gpu.horizontal_range(), (0x260, 0xc60));
    assert_eq!(gpu.vertical_range(), (0x10, 0x100));

    let status = gpu.status();

    assert_eq!(status & (1 << 23), 0);
    assert_eq!((status >> 16) & 7, 0b010);
    assert_ne!(status & (1 << 20), 0);
    assert_ne!(status & (1 << 21), 0);
    assert_ne!(status & (1 << 22), 0);

    // 368 pixel mode
    gpu.gp1(0x0800_0040).unwrap();
    assert_eq!((gpu.status() >> 16) & 7, 0b001);
}

#[test]
fn test_gpu_info() {
    let (mut gpu, _) = gpu();

    feed(&mut gpu, &[0xe300_0000 | (20 << 10) | 10]);

    gpu.gp1(0x1000_0003).unwrap();
    assert_eq!(gpu.read(), (20 << 10) | 10);

    gpu.gp1(0x1000_0007).unwrap();
    assert_eq!(gpu.read(), 2);

    // Unknown selectors keep the previous value
    gpu.gp1(0x1000_0000).unwrap();
    assert_eq!(gpu.read(), 2);
}

#[test]
fn test_unknown_commands_follow_policy() {
    let (mut gpu, renderer) = gpu();

    gpu.gp0(0x0300_0000).unwrap();
    gpu.gp1(0x2000_0000).unwrap();
    assert!(renderer.draws().is_empty());

    let (mut gpu, _) = gpu_with(UnimplementedPolicy::Halt);

    assert!(matches!(
        gpu.gp0(0x0300_0000),
        Err(PsxError::UnimplementedGp0(0x0300_0000))
    ));
    assert!(matches!(
        gpu.gp1(0x2000_0000),
        Err(PsxError::UnimplementedGp1(0x2000_0000))
    ));

    // Store image is recognized but not emulated
    feed_halting(&mut gpu);
}

fn feed_halting(gpu: &mut Gpu) {
    assert!(gpu.gp0(0xc000_0000).is_ok());
    assert!(gpu.gp0(0).is_ok());
    assert!(gpu.gp0(0x0001_0001).is_err());
}
