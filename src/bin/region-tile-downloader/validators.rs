use region_tile_downloader::MAX_ZOOM;

pub fn is_numeric_min(
    min: usize,
) -> impl Fn(&str) -> Result<usize, String> + Clone + Send + Sync + 'static {
    move |v: &str| {
        let val = v
            .parse::<usize>()
            .map_err(|_| "must be numeric".to_owned())?;

        if val < min {
            return Err(format!("must be >= {}", min));
        }

        Ok(val)
    }
}

pub fn is_zoom(v: &str) -> Result<u8, String> {
    let val = v.parse::<u8>().map_err(|_| "must be numeric".to_owned())?;

    if val > MAX_ZOOM {
        return Err(format!("must be <= {}", MAX_ZOOM));
    }

    Ok(val)
}

pub fn is_extension(v: &str) -> Result<String, String> {
    let ext = v.trim_start_matches('.');

    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("must be a plain file extension like `png`".to_owned());
    }

    Ok(ext.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_min() {
        let workers = is_numeric_min(1);
        assert_eq!(workers("4"), Ok(4));
        assert!(workers("0").is_err());
        assert!(workers("four").is_err());
    }

    #[test]
    fn zoom() {
        assert_eq!(is_zoom("0"), Ok(0));
        assert_eq!(is_zoom("14"), Ok(14));
        assert!(is_zoom("31").is_err());
        assert!(is_zoom("-1").is_err());
    }

    #[test]
    fn extension() {
        assert_eq!(is_extension(".png").as_deref(), Ok("png"));
        assert_eq!(is_extension("jpg").as_deref(), Ok("jpg"));
        assert!(is_extension("png/../x").is_err());
        assert!(is_extension("").is_err());
    }
}
