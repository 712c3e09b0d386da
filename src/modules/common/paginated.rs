use std::cmp::min;

use crate::{
    modules::{
        database::Paginated,
        error::{code::ErrorCode, RustRelayResult},
    },
    raise_error,
};

pub fn paginate_vec<T: Clone>(
    items: &Vec<T>,
    page: Option<u64>,
    page_size: Option<u64>,
) -> RustRelayResult<Paginated<T>> {
    let total_items = items.len() as u64;

    let (offset, total_pages) = match (page, page_size) {
        (Some(p), Some(s)) if p > 0 && s > 0 => {
            let offset = (p - 1) * s;
            let total_pages = if total_items > 0 {
                (total_items + s - 1) / s
            } else {
                0
            };
            (Some(offset), Some(total_pages))
        }
        (Some(0), _) | (_, Some(0)) => {
            return Err(raise_error!(
                "'page' and 'page_size' must be greater than 0.".into(),
                ErrorCode::InvalidParameter
            ));
        }
        _ => (None, None),
    };

    let data = match offset {
        Some(offset) if offset >= total_items => vec![],
        Some(offset) => {
            let end = min(offset + page_size.unwrap_or(total_items), total_items) as usize;
            items[offset as usize..end].to_vec()
        }
        None => items.clone(),
    };

    Ok(Paginated::new(
        page,
        page_size,
        total_items,
        total_pages,
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_vec_middle_page() {
        let items: Vec<u32> = (1..=10).collect();
        let paginated = paginate_vec(&items, Some(2), Some(3)).unwrap();
        assert_eq!(paginated.items, vec![4, 5, 6]);
        assert_eq!(paginated.total_items, 10);
        assert_eq!(paginated.total_pages, Some(4));
    }

    #[test]
    fn test_paginate_vec_offset_past_end() {
        let items: Vec<u32> = (1..=3).collect();
        let paginated = paginate_vec(&items, Some(5), Some(3)).unwrap();
        assert!(paginated.items.is_empty());
    }

    #[test]
    fn test_paginate_vec_rejects_zero_page() {
        let items: Vec<u32> = vec![1];
        assert!(paginate_vec(&items, Some(0), Some(3)).is_err());
    }
}
