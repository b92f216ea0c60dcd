//! Content-type detection from leading bytes.

/// How many leading bytes [`sniff_extension`] wants to see.
pub const SNIFF_LEN: usize = 512;

/// Guess a file extension (without dot) from the first bytes of a payload.
pub fn sniff_extension(head: &[u8]) -> Option<&'static str> {
    let extension = match head {
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => "png",
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "wav",
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => "tif",
        [_, _, _, _, b'f', b't', b'y', b'p', brand @ ..] => iso_media(brand)?,
        [0x00, 0x00, 0x01, 0x00, ..] => "ico",
        [b'%', b'P', b'D', b'F', b'-', ..] => "pdf",
        [0x50, 0x4B, 0x03, 0x04, ..] => "zip",
        [0x1F, 0x8B, ..] => "gz",
        [0x1A, 0x45, 0xDF, 0xA3, ..] => "webm",
        [b'O', b'g', b'g', b'S', ..] => "ogg",
        [b'w', b'O', b'F', b'F', ..] => "woff",
        [b'w', b'O', b'F', b'2', ..] => "woff2",
        [b'I', b'D', b'3', ..] | [0xFF, 0xFB | 0xF3 | 0xF2, ..] => "mp3",
        [b'B', b'M', ..] if head.len() >= 14 => "bmp",
        _ if is_svg(head) => "svg",
        _ => return None,
    };
    Some(extension)
}

fn iso_media(brand: &[u8]) -> Option<&'static str> {
    let brand = brand.get(..4)?;
    Some(match brand {
        b"avif" | b"avis" => "avif",
        b"heic" | b"heix" | b"mif1" => "heic",
        b"qt  " => "mov",
        b"M4A " => "m4a",
        _ => "mp4",
    })
}

fn is_svg(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") {
        return true;
    }
    (text.starts_with("<?xml") || text.starts_with("<!DOCTYPE svg")) && text.contains("<svg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_jpeg() {
        assert_eq!(sniff_extension(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]), Some("jpg"));
    }

    #[test]
    fn detect_png() {
        let header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        assert_eq!(sniff_extension(&header), Some("png"));
    }

    #[test]
    fn detect_gif_variants() {
        assert_eq!(sniff_extension(b"GIF89a...."), Some("gif"));
        assert_eq!(sniff_extension(b"GIF87a...."), Some("gif"));
    }

    #[test]
    fn detect_webp() {
        assert_eq!(sniff_extension(b"RIFF\x24\x00\x00\x00WEBPVP8 "), Some("webp"));
    }

    #[test]
    fn detect_iso_media_brands() {
        assert_eq!(sniff_extension(b"\x00\x00\x00\x1cftypavif\x00\x00"), Some("avif"));
        assert_eq!(sniff_extension(b"\x00\x00\x00\x18ftypisom\x00\x00"), Some("mp4"));
        assert_eq!(sniff_extension(b"\x00\x00\x00\x18ftyp"), None);
    }

    #[test]
    fn detect_pdf_and_archives() {
        assert_eq!(sniff_extension(b"%PDF-1.7\n"), Some("pdf"));
        assert_eq!(sniff_extension(&[0x50, 0x4B, 0x03, 0x04, 0x14]), Some("zip"));
        assert_eq!(sniff_extension(&[0x1F, 0x8B, 0x08, 0x00]), Some("gz"));
    }

    #[test]
    fn detect_svg() {
        assert_eq!(sniff_extension(b"  <svg xmlns=\"http://www.w3.org/2000/svg\">"), Some("svg"));
        assert_eq!(
            sniff_extension(b"<?xml version=\"1.0\"?>\n<svg width=\"1\"></svg>"),
            Some("svg")
        );
        assert_eq!(sniff_extension(b"<?xml version=\"1.0\"?><feed/>"), None);
    }

    #[test]
    fn short_bmp_header_is_not_enough() {
        assert_eq!(sniff_extension(b"BM"), None);
    }

    #[test]
    fn detect_unknown() {
        assert_eq!(sniff_extension(&[0xDE, 0xAD, 0xBE, 0xEF]), None);
        assert_eq!(sniff_extension(b"plain text"), None);
        assert_eq!(sniff_extension(&[]), None);
    }
}
