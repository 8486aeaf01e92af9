use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use image::DynamicImage;
use parking_lot::Mutex;
use tracing::debug;

use crate::compose::decode_image;
use crate::error::PppError;

/// Default number of decoded images kept in memory.
pub const DEFAULT_STORE_SIZE: usize = 10;

/// Content-addressed cache of decoded images.
///
/// Images are keyed by the CRC-32 of their encoded bytes. Once the cache holds
/// more than its capacity, the oldest inserted image is dropped first. Lookups
/// do not refresh an entry's position.
pub struct ImageStore {
    inner: Mutex<Inner>,
}

struct Inner {
    capacity: usize,
    images: HashMap<String, Arc<DynamicImage>>,
    insertion_order: VecDeque<String>,
}

impl Inner {
    fn evict_overflow(&mut self) {
        while self.images.len() > self.capacity {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            self.images.remove(&oldest);
            debug!(image_id = %oldest, "evicted image from store");
        }
    }
}

/// Stable fingerprint for an encoded image buffer.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:08x}", crc32fast::hash(bytes))
}

impl ImageStore {
    /// Empty store holding at most `capacity` images.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity,
                images: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
        }
    }

    /// Decode and cache `bytes`, returning their fingerprint.
    ///
    /// Bytes already in the store are not decoded again.
    pub fn put(&self, bytes: &[u8]) -> Result<String, PppError> {
        let id = fingerprint(bytes);
        if self.contains(&id) {
            debug!(image_id = %id, "image already in store");
            return Ok(id);
        }

        // Decode outside the lock; a concurrent put of the same bytes is
        // resolved by the entry check below.
        let decoded = decode_image(bytes)?;
        debug!(
            image_id = %id,
            width = decoded.width(),
            height = decoded.height(),
            "decoded image"
        );

        let mut inner = self.inner.lock();
        if !inner.images.contains_key(&id) {
            inner.images.insert(id.clone(), Arc::new(decoded));
            inner.insertion_order.push_back(id.clone());
            inner.evict_overflow();
        }
        Ok(id)
    }

    /// Shared handle to the image stored under `id`.
    pub fn get(&self, id: &str) -> Result<Arc<DynamicImage>, PppError> {
        self.inner
            .lock()
            .images
            .get(id)
            .cloned()
            .ok_or_else(|| PppError::NotFound(id.to_string()))
    }

    /// Whether an image is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().images.contains_key(id)
    }

    /// Number of stored images.
    pub fn len(&self) -> usize {
        self.inner.lock().images.len()
    }

    /// Whether no image is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most images kept before the oldest is evicted.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Change the capacity, evicting the oldest images that no longer fit.
    pub fn configure(&self, max_entries: usize) {
        let mut inner = self.inner.lock();
        inner.capacity = max_entries;
        inner.evict_overflow();
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageEncoder;

    fn make_test_png(width: u32, height: u32, seed: u8) -> Vec<u8> {
        let mut img = image::RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([seed, (x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8]);
        }
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    #[test]
    fn put_twice_yields_same_id_and_one_entry() {
        let store = ImageStore::new(4);
        let png = make_test_png(8, 6, 1);
        let first = store.put(&png).unwrap();
        let second = store.put(&png).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn fingerprint_is_eight_hex_digits() {
        let id = fingerprint(b"hello");
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, fingerprint(b"hello"));
    }

    #[test]
    fn get_returns_decoded_image() {
        let store = ImageStore::new(4);
        let id = store.put(&make_test_png(8, 6, 2)).unwrap();
        let image = store.get(&id).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = ImageStore::new(4);
        assert!(matches!(store.get("deadbeef"), Err(PppError::NotFound(_))));
    }

    #[test]
    fn undecodable_bytes_leave_store_untouched() {
        let store = ImageStore::new(4);
        store.put(&make_test_png(4, 4, 3)).unwrap();
        let result = store.put(b"not an image");
        assert!(matches!(result, Err(PppError::DecodeError(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn overflow_evicts_oldest_inserted() {
        let store = ImageStore::new(3);
        let ids: Vec<String> = (0..5u8)
            .map(|seed| store.put(&make_test_png(4, 4, seed)).unwrap())
            .collect();

        assert_eq!(store.len(), 3);
        assert!(!store.contains(&ids[0]));
        assert!(!store.contains(&ids[1]));
        for id in &ids[2..] {
            assert!(store.get(id).is_ok());
        }
    }

    #[test]
    fn access_does_not_refresh_eviction_order() {
        let store = ImageStore::new(2);
        let a = store.put(&make_test_png(4, 4, 10)).unwrap();
        let b = store.put(&make_test_png(4, 4, 11)).unwrap();
        store.get(&a).unwrap();
        let c = store.put(&make_test_png(4, 4, 12)).unwrap();

        assert!(!store.contains(&a));
        assert!(store.contains(&b));
        assert!(store.contains(&c));
    }

    #[test]
    fn shrinking_capacity_evicts_immediately() {
        let store = ImageStore::new(5);
        let ids: Vec<String> = (0..4u8)
            .map(|seed| store.put(&make_test_png(4, 4, seed)).unwrap())
            .collect();

        store.configure(1);
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&ids[3]));
    }

    #[test]
    fn held_image_survives_eviction() {
        let store = ImageStore::new(1);
        let id = store.put(&make_test_png(5, 5, 20)).unwrap();
        let held = store.get(&id).unwrap();
        store.put(&make_test_png(5, 5, 21)).unwrap();
        assert!(!store.contains(&id));
        assert_eq!(held.width(), 5);
    }
}
