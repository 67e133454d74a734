use crate::storage::{BOOKMARK_KEY, KeyValueStore, read_json, write_json};
use serde::{Deserialize, Serialize};

const SURAH_COUNT: u16 = 114;

/// Last-read position in the Quran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub surah_id: u16,
    pub ayah_number: u16,
    pub surah_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_ayahs: Option<u16>,
}

impl Bookmark {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=SURAH_COUNT).contains(&self.surah_id) {
            return Err(format!("surahId must be between 1 and {SURAH_COUNT}"));
        }
        if self.ayah_number == 0 {
            return Err("ayahNumber must be at least 1".to_string());
        }
        if let Some(total) = self.total_ayahs {
            if self.ayah_number > total {
                return Err("ayahNumber exceeds totalAyahs".to_string());
            }
        }
        if self.surah_name.trim().is_empty() {
            return Err("surahName must not be empty".to_string());
        }
        Ok(())
    }

    pub fn progress_percent(&self) -> Option<u8> {
        let total = u32::from(self.total_ayahs?);
        if total == 0 {
            return None;
        }
        let read = u32::from(self.ayah_number.min(self.total_ayahs?));
        Some(((read * 100 + total / 2) / total) as u8)
    }
}

/// Bookmark as served over HTTP, with reading progress through the surah.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkView {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
}

impl From<Bookmark> for BookmarkView {
    fn from(bookmark: Bookmark) -> Self {
        let progress_percent = bookmark.progress_percent();
        Self {
            bookmark,
            progress_percent,
        }
    }
}

pub fn load_bookmark<S: KeyValueStore + ?Sized>(store: &S) -> Option<Bookmark> {
    read_json(store, BOOKMARK_KEY)
}

pub fn save_bookmark<S: KeyValueStore + ?Sized>(store: &mut S, bookmark: &Bookmark) {
    write_json(store, BOOKMARK_KEY, bookmark);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;

    fn al_baqarah(ayah: u16) -> Bookmark {
        Bookmark {
            surah_id: 2,
            ayah_number: ayah,
            surah_name: "Al-Baqarah".to_string(),
            total_ayahs: Some(286),
        }
    }

    #[test]
    fn reads_camel_case_shape() {
        let mut store = LocalStore::default();
        store.set(
            BOOKMARK_KEY,
            r#"{"surahId":1,"ayahNumber":5,"surahName":"Al-Fatiha"}"#.to_string(),
        );
        let bookmark = load_bookmark(&store).unwrap();
        assert_eq!(bookmark.surah_id, 1);
        assert_eq!(bookmark.total_ayahs, None);
        assert_eq!(bookmark.progress_percent(), None);
    }

    #[test]
    fn malformed_bookmark_is_absent() {
        let mut store = LocalStore::default();
        store.set(BOOKMARK_KEY, "not json".to_string());
        assert!(load_bookmark(&store).is_none());
    }

    #[test]
    fn saved_bookmark_reloads() {
        let mut store = LocalStore::default();
        save_bookmark(&mut store, &al_baqarah(143));
        assert_eq!(load_bookmark(&store), Some(al_baqarah(143)));
        assert_eq!(al_baqarah(143).progress_percent(), Some(50));
    }

    #[test]
    fn validation_rejects_out_of_range_positions() {
        assert!(al_baqarah(1).validate().is_ok());
        assert!(al_baqarah(0).validate().is_err());
        assert!(al_baqarah(287).validate().is_err());
        let mut unknown = al_baqarah(1);
        unknown.surah_id = 115;
        assert!(unknown.validate().is_err());
    }

    #[test]
    fn view_carries_progress() {
        let json = serde_json::to_value(BookmarkView::from(al_baqarah(143))).unwrap();
        assert_eq!(json["surahName"], "Al-Baqarah");
        assert_eq!(json["totalAyahs"], 286);
        assert_eq!(json["progressPercent"], 50);

        let mut open_ended = al_baqarah(7);
        open_ended.total_ayahs = None;
        let json = serde_json::to_value(BookmarkView::from(open_ended)).unwrap();
        assert!(json.get("progressPercent").is_none());
    }
}
