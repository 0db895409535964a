use std::future::Future;

use crate::{Page, Result};

/// Repeatedly calls `fetch` with a 1-based page cursor and collects every
/// item in fetch order.
///
/// Stops after an empty page or once a page reports no `next` cursor. The
/// first failed fetch aborts the loop and its error is returned; items from
/// earlier pages are discarded.
pub async fn paginate<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = vec![];
    let mut page = 1u32;
    loop {
        let Page {
            items: page_items,
            next,
        } = fetch(page).await?;
        log::debug!("Fetched page {page} ({} items)", page_items.len());
        if page_items.is_empty() {
            break;
        }
        items.extend(page_items);

        match next {
            Some(next) => page = next,
            None => break,
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn numbered(page: u32, len: usize) -> Vec<u32> {
        (0..len as u32).map(|i| page * 1000 + i).collect()
    }

    #[tokio::test]
    async fn accumulates_all_pages_in_order() {
        let mut calls = 0;
        let items = paginate(|page| {
            calls += 1;
            async move {
                Ok(match page {
                    1 => Page {
                        items: numbered(1, 100),
                        next: Some(2),
                    },
                    2 => Page {
                        items: numbered(2, 100),
                        next: Some(3),
                    },
                    _ => Page::last(numbered(3, 1)),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(items.len(), 201);
        assert_eq!(items[0], 1000);
        assert_eq!(items[100], 2000);
        assert_eq!(items[200], 3000);
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let mut calls = 0;
        let items = paginate(|page| {
            calls += 1;
            async move {
                Ok(Page {
                    items: if page == 1 { vec![1, 2] } else { vec![] },
                    next: Some(page + 1),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_listing() {
        let items: Vec<u32> = paginate(|_| async { Ok(Page::last(vec![])) })
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn failure_aborts_without_partial_results() {
        let mut calls = 0;
        let result = paginate(|page| {
            calls += 1;
            async move {
                if page == 2 {
                    return Err(Error::fetch("workflow runs", "connection reset"));
                }
                Ok(Page {
                    items: vec![page],
                    next: Some(page + 1),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Fetch { .. })));
        assert_eq!(calls, 2);
    }
}
