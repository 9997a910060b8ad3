use crate::errors::{AppError, AppResult};
use regex::Regex;
use std::path::Path;

pub struct InputValidator;

impl InputValidator {
    pub fn validate_container_name(name: &str) -> AppResult<()> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("container", "Container name cannot be empty"));
        }

        if trimmed.len() > 100 {
            return Err(AppError::validation("container", "Container name too long (max 100 characters)"));
        }

        // Check for potentially dangerous characters
        let safe_chars = Regex::new(r"^[a-zA-Z0-9\s\-_\.]+$").unwrap();
        if !safe_chars.is_match(trimmed) {
            return Err(AppError::validation("container", "Container name contains invalid characters"));
        }

        Ok(())
    }

    pub fn validate_endpoint_url(url: &str) -> AppResult<()> {
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("url", "Endpoint URL cannot be empty"));
        }

        let endpoint_pattern = Regex::new(r"^https?://[\w\-\.]+(:\d+)?(/[\w\-\./%]*)?$").unwrap();
        if !endpoint_pattern.is_match(trimmed) {
            return Err(AppError::invalid_endpoint(trimmed));
        }

        if trimmed.len() > 500 {
            return Err(AppError::validation("url", "Endpoint URL too long"));
        }

        Ok(())
    }

    pub fn validate_file_path(path: &str) -> AppResult<()> {
        if path.trim().is_empty() {
            return Err(AppError::validation("file_path", "File path cannot be empty"));
        }

        let path_obj = Path::new(path);

        // Check for path traversal attempts
        if path.contains("..") || path.contains('~') {
            return Err(AppError::validation("file_path", "Invalid file path detected"));
        }

        // Ensure it's an image file
        if let Some(extension) = path_obj.extension() {
            let ext = extension.to_string_lossy().to_lowercase();
            if !matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp") {
                return Err(AppError::invalid_file_type(path));
            }
        } else {
            return Err(AppError::validation("file_path", "File must have an extension"));
        }

        // Check file exists and is readable
        if !path_obj.exists() {
            return Err(AppError::file_not_found(path));
        }

        if !path_obj.is_file() {
            return Err(AppError::validation("file_path", "Path is not a file"));
        }

        Ok(())
    }

    pub fn sanitize_filename(filename: &str) -> String {
        // Remove or replace unsafe characters in filenames
        let unsafe_chars = Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap();
        let sanitized = unsafe_chars.replace_all(filename.trim(), "_");

        // Limit length, cutting on a char boundary so multibyte names
        // cannot split mid-character
        if sanitized.len() > 255 {
            let mut cut = 0;
            for (idx, ch) in sanitized.char_indices() {
                if idx + ch.len_utf8() > 252 {
                    break;
                }
                cut = idx + ch.len_utf8();
            }
            format!("{}...", &sanitized[..cut])
        } else {
            sanitized.to_string()
        }
    }

    pub fn validate_image_file(file_path: &str, max_size_mb: u64) -> AppResult<()> {
        Self::validate_file_path(file_path)?;

        let metadata = std::fs::metadata(file_path)?;

        let max_bytes = max_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(AppError::file_too_large(file_path, max_size_mb));
        }

        // Verify it's actually an image by trying to open it
        image::open(file_path)?;

        Ok(())
    }
}
