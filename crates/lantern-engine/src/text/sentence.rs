use std::collections::HashMap;

/// Handle to a sentence owned by a [`Sentences`] table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SentenceId(u32);

/// A sentence queued for drawing this frame, top-left at `(x, y)` in
/// logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QueuedSentence {
    pub id: SentenceId,
    pub x: f32,
    pub y: f32,
}

/// Numbered text slots that are prepared once and drawn any number of times.
///
/// Ids are never reused, so a stale id after `delete` is reported instead of
/// silently drawing another sentence.
#[derive(Debug, Default)]
pub struct Sentences {
    next: u32,
    texts: HashMap<SentenceId, String>,
    queued: Vec<QueuedSentence>,
}

impl Sentences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an empty sentence.
    pub fn create(&mut self) -> SentenceId {
        let id = SentenceId(self.next);
        self.next += 1;
        self.texts.insert(id, String::new());
        id
    }

    /// Replaces the text of `id`. Returns `false` for unknown ids.
    pub fn prepare(&mut self, id: SentenceId, text: &str) -> bool {
        match self.texts.get_mut(&id) {
            Some(slot) => {
                slot.clear();
                slot.push_str(text);
                true
            }
            None => {
                log::warn!("prepare on unknown sentence {id:?}");
                false
            }
        }
    }

    /// Frees `id`, dropping any queued draws of it. Returns `false` for unknown ids.
    pub fn delete(&mut self, id: SentenceId) -> bool {
        self.queued.retain(|q| q.id != id);
        self.texts.remove(&id).is_some()
    }

    pub fn text(&self, id: SentenceId) -> Option<&str> {
        self.texts.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Queues `id` for drawing at `(x, y)`. Unknown ids are ignored.
    pub fn queue(&mut self, x: f32, y: f32, id: SentenceId) {
        if self.texts.contains_key(&id) {
            self.queued.push(QueuedSentence { id, x, y });
        } else {
            log::warn!("render of unknown sentence {id:?}");
        }
    }

    /// Takes the draws queued since the last call, in queue order.
    pub fn take_queued(&mut self) -> Vec<QueuedSentence> {
        std::mem::take(&mut self.queued)
    }
}
