use std::sync::mpsc;

use anyhow::{anyhow, Result};
use gggg_text::{ConsoleLog, FontdueRasterizer, Render, TextConfig, TextSystem};
use log::info;
use wgpu::{
    BufferDescriptor, BufferUsages, Color, CommandEncoderDescriptor, Extent3d, ImageCopyBuffer,
    ImageDataLayout, MapMode, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
    TextureViewDescriptor,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 160;
const FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

// usage: console-snapshot <font.ttf> [out.png] [config.toml]
fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let font = args
        .next()
        .ok_or(anyhow!("usage: console-snapshot <font.ttf> [out.png] [config.toml]"))?;
    let output = args.next().unwrap_or_else(|| "console.png".into());
    let config = match args.next() {
        Some(path) => TextConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => TextConfig::default(),
    };
    let console_config = config.console.clone().with_font(&font, config.console.font_size);

    let render = Render::headless(FORMAT)?;
    let mut system = TextSystem::new(render, FontdueRasterizer, config)?;
    let mut console = ConsoleLog::new(&console_config)?;

    for line in [
        "gggg console",
        "fonts are rasterized once per size",
        "and shared between every line",
        "unknown glyphs fall back: \u{e9}",
        "newest line sits at the bottom",
        "this one pushed the first line out",
    ] {
        console.log(&mut system, line)?;
    }
    let stats = console.render(&mut system)?;
    info!("{} glyphs in {} draws", stats.glyphs, stats.draws);

    let target = system.backend().device().create_texture(&TextureDescriptor {
        label: Some("snapshot"),
        size: Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&TextureViewDescriptor::default());

    system.backend_mut().submit(
        &view,
        WIDTH,
        HEIGHT,
        Some(Color {
            r: 0.05,
            g: 0.05,
            b: 0.05,
            a: 1.0,
        }),
    )?;

    let pixels = read_back(system.backend(), &target)?;
    image::save_buffer(&output, &pixels, WIDTH, HEIGHT, image::ColorType::Rgba8)?;
    info!("Wrote {}", output);

    console.clear(&mut system)?;
    system.shutdown();
    Ok(())
}

fn read_back(render: &Render, texture: &wgpu::Texture) -> Result<Vec<u8>> {
    let device = render.device();
    let unpadded = WIDTH * 4;
    // copies need rows aligned to 256 bytes
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = unpadded.div_ceil(align) * align;

    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some("snapshot readback"),
        size: (padded * HEIGHT) as u64,
        usage: BufferUsages::COPY_DST | BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor::default());
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        ImageCopyBuffer {
            buffer: &buffer,
            layout: ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(HEIGHT),
            },
        },
        Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
    );
    render.queue().submit([encoder.finish()]);

    let slice = buffer.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    receiver.recv()??;

    let data = slice.get_mapped_range();
    let pixels = data
        .chunks(padded as usize)
        .flat_map(|row| &row[..unpadded as usize])
        .copied()
        .collect::<Vec<_>>();
    drop(data);
    buffer.unmap();

    Ok(pixels)
}
