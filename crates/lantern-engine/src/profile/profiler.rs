use std::cell::RefCell;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Statistics for one named section at one nesting position.
#[derive(Debug, Clone)]
struct Section {
    name: &'static str,
    parent: Option<usize>,
    children: Vec<usize>,

    calls: u64,
    total: Duration,
    frame_accum: Duration,
    last_frame: Duration,
}

impl Section {
    fn new(name: &'static str, parent: Option<usize>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            calls: 0,
            total: Duration::ZERO,
            frame_accum: Duration::ZERO,
            last_frame: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    sections: Vec<Section>,
    roots: Vec<usize>,
    open: Vec<(usize, Instant)>,
    frames: u64,
}

impl Inner {
    fn enter(&mut self, name: &'static str) -> usize {
        let parent = self.open.last().map(|(idx, _)| *idx);
        let siblings = match parent {
            Some(p) => &self.sections[p].children,
            None => &self.roots,
        };

        let existing = siblings
            .iter()
            .copied()
            .find(|&idx| self.sections[idx].name == name);

        let idx = match existing {
            Some(idx) => idx,
            None => {
                let idx = self.sections.len();
                self.sections.push(Section::new(name, parent));
                match parent {
                    Some(p) => self.sections[p].children.push(idx),
                    None => self.roots.push(idx),
                }
                idx
            }
        };

        self.open.push((idx, Instant::now()));
        idx
    }

    fn exit_with(&mut self, elapsed: Duration) {
        let Some((idx, _)) = self.open.pop() else {
            log::warn!("profiler: section closed with nothing open");
            return;
        };
        let s = &mut self.sections[idx];
        s.calls += 1;
        s.total += elapsed;
        s.frame_accum += elapsed;
    }

    fn exit(&mut self) {
        let elapsed = self
            .open
            .last()
            .map(|(_, start)| start.elapsed())
            .unwrap_or_default();
        self.exit_with(elapsed);
    }

    fn end_frame(&mut self) {
        for s in &mut self.sections {
            s.last_frame = std::mem::take(&mut s.frame_accum);
        }
        self.frames += 1;
    }

    fn depth_of(&self, mut idx: usize) -> usize {
        let mut depth = 0;
        while let Some(p) = self.sections[idx].parent {
            depth += 1;
            idx = p;
        }
        depth
    }

    fn walk(&self, idx: usize, out: &mut Vec<usize>) {
        out.push(idx);
        for &child in &self.sections[idx].children {
            self.walk(child, out);
        }
    }
}

/// Hierarchical CPU profiler.
///
/// Sections nest by the order they are opened: a section opened while
/// another is open becomes its child. The same name under the same parent
/// accumulates into one entry. Single-threaded; guards borrow the profiler
/// immutably so nested scopes can coexist.
#[derive(Debug, Default)]
pub struct Profiler {
    inner: RefCell<Inner>,
}

/// Closes its section on drop.
#[must_use = "the section closes as soon as the guard is dropped"]
pub struct ProfileScope<'a> {
    profiler: &'a Profiler,
}

impl Drop for ProfileScope<'_> {
    fn drop(&mut self) {
        self.profiler.inner.borrow_mut().exit();
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a section that closes when the returned guard drops.
    pub fn scope(&self, name: &'static str) -> ProfileScope<'_> {
        self.inner.borrow_mut().enter(name);
        ProfileScope { profiler: self }
    }

    /// Closes the frame: each section's time spent since the previous call
    /// becomes its "last frame" value.
    pub fn collect_query_results(&self) {
        self.inner.borrow_mut().end_frame();
    }

    /// Drops all statistics. Open sections keep running and are recreated
    /// on their next use.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        let still_open = !inner.open.is_empty();
        if still_open {
            log::debug!("profiler: reset while sections are open; they will be discarded");
        }
        *inner = Inner::default();
    }

    /// Number of completed frames since the last reset.
    pub fn frames(&self) -> u64 {
        self.inner.borrow().frames
    }

    /// Call count of the first section found with `name`, at any depth.
    pub fn calls(&self, name: &str) -> Option<u64> {
        let inner = self.inner.borrow();
        inner.sections.iter().find(|s| s.name == name).map(|s| s.calls)
    }

    /// Formats the section tree, one line per section, children indented.
    pub fn dump_levels(&self) -> String {
        let inner = self.inner.borrow();

        let mut order = Vec::with_capacity(inner.sections.len());
        for &root in &inner.roots {
            inner.walk(root, &mut order);
        }

        let name_width = order
            .iter()
            .map(|&idx| inner.depth_of(idx) * 2 + inner.sections[idx].name.len())
            .max()
            .unwrap_or(0)
            .max("Section".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<name_width$}  {:>8}  {:>9}  {:>9}",
            "Section", "Calls", "Avg(ms)", "Frame(ms)"
        );

        for idx in order {
            let s = &inner.sections[idx];
            let label = format!("{}{}", "  ".repeat(inner.depth_of(idx)), s.name);
            let avg_ms = if s.calls == 0 {
                0.0
            } else {
                s.total.as_secs_f64() * 1000.0 / s.calls as f64
            };
            let frame_ms = s.last_frame.as_secs_f64() * 1000.0;
            let _ = writeln!(
                out,
                "{label:<name_width$}  {:>8}  {avg_ms:>9.3}  {frame_ms:>9.3}",
                s.calls
            );
        }

        out
    }

    #[cfg(test)]
    fn record(&self, name: &'static str, elapsed: Duration, nested: impl FnOnce(&Self)) {
        self.inner.borrow_mut().enter(name);
        nested(self);
        self.inner.borrow_mut().exit_with(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn nested_scopes_form_a_tree() {
        let p = Profiler::new();
        {
            let _frame = p.scope("Frame");
            {
                let _models = p.scope("Render models");
            }
            {
                let _dump = p.scope("Dump");
            }
        }

        let dump = p.dump_levels();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Section"));
        assert!(lines[1].starts_with("Frame "));
        assert!(lines[2].starts_with("  Render models"));
        assert!(lines[3].starts_with("  Dump"));
    }

    #[test]
    fn repeated_sections_accumulate_calls() {
        let p = Profiler::new();
        for _ in 0..3 {
            let _frame = p.scope("Frame");
            let _swap = p.scope("Swap");
        }
        assert_eq!(p.calls("Frame"), Some(3));
        assert_eq!(p.calls("Swap"), Some(3));
        assert_eq!(p.dump_levels().lines().count(), 3);
    }

    #[test]
    fn same_name_under_different_parents_is_distinct() {
        let p = Profiler::new();
        p.record("A", ms(1), |p| p.record("X", ms(1), |_| {}));
        p.record("B", ms(1), |p| p.record("X", ms(1), |_| {}));
        assert_eq!(p.dump_levels().lines().count(), 5);
    }

    #[test]
    fn collect_publishes_frame_times() {
        let p = Profiler::new();
        p.record("Frame", ms(10), |p| p.record("Swap", ms(4), |_| {}));
        p.record("Frame", ms(6), |_| {});
        p.collect_query_results();

        let dump = p.dump_levels();
        let frame_line = dump.lines().find(|l| l.starts_with("Frame")).unwrap();
        let cols: Vec<&str> = frame_line.split_whitespace().collect();
        assert_eq!(cols, vec!["Frame", "2", "8.000", "16.000"]);

        p.collect_query_results();
        let dump = p.dump_levels();
        let frame_line = dump.lines().find(|l| l.starts_with("Frame")).unwrap();
        assert!(frame_line.ends_with("0.000"));
        assert_eq!(p.frames(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let p = Profiler::new();
        p.record("Frame", ms(1), |_| {});
        p.collect_query_results();
        p.reset();

        assert_eq!(p.calls("Frame"), None);
        assert_eq!(p.frames(), 0);
        assert_eq!(p.dump_levels().lines().count(), 1);
    }

    #[test]
    fn reset_inside_open_scope_does_not_panic() {
        let p = Profiler::new();
        let guard = p.scope("Frame");
        p.reset();
        drop(guard);
        assert_eq!(p.calls("Frame"), None);
    }
}
