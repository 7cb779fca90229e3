pub mod images;

pub use images::{
    GENERATED_IMAGES_ROUTE, cleanup_old_images, content_type_for, decode_image_payload,
    public_image_url, store_generated_image,
};
