use anyhow::Context as _;

use crate::{context::Context, data_structures::texture::Texture, resources::load_binary};

/// Face suffixes in cube layer order.
pub const CUBE_FACES: [&str; 6] = ["right", "left", "bottom", "top", "front", "back"];

pub fn cube_face_names(prefix: &str, ext: &str) -> [String; 6] {
    CUBE_FACES.map(|face| format!("{prefix}{face}.{ext}"))
}

/// Decodes an image file and uploads it flipped so `v = 0` is its bottom row.
pub async fn load_texture(ctx: &Context, file_name: &str) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    let img = image::load_from_memory(&data).with_context(|| format!("decoding {file_name}"))?;
    Ok(Texture::from_image(&ctx.device, &ctx.queue, &img, file_name)?)
}

/// Loads `{prefix}{face}.{ext}` for every face in [`CUBE_FACES`].
pub async fn load_cube_texture(ctx: &Context, prefix: &str, ext: &str) -> anyhow::Result<Texture> {
    let names = cube_face_names(prefix, ext);
    let faces = futures::future::try_join_all(names.iter().map(|name| async move {
        let data = load_binary(name).await?;
        let img = image::load_from_memory(&data).with_context(|| format!("decoding {name}"))?;
        anyhow::Ok(img.to_rgba8())
    }))
    .await?;
    let faces: [image::RgbaImage; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("cube map `{prefix}` needs six faces"))?;
    Ok(Texture::cube(&ctx.device, &ctx.queue, &faces, prefix)?)
}
