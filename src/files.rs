use crate::model::{ContainerTarget, FileRecord};

const PERMISSION_CHARS: &str = "-bcdlprwxstST";

/// Entries parsed from one `ls -la` run, plus how many non-summary lines did not match.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ParsedListing {
    pub entries: Vec<FileRecord>,
    pub skipped: usize,
}

pub fn parse(raw: &str) -> Vec<FileRecord> {
    parse_listing(raw).entries
}

pub fn parse_listing(raw: &str) -> ParsedListing {
    let mut listing = ParsedListing::default();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("total ") {
            continue;
        }

        match parse_line(line) {
            Some(entry) => listing.entries.push(entry),
            None => listing.skipped += 1,
        }
    }
    listing
}

// <perms> <links> <owner> <group> <size> <month> <day> <time|year> <name...>
fn parse_line(line: &str) -> Option<FileRecord> {
    let (permissions, rest) = next_field(line)?;
    if permissions.chars().count() != 10
        || !permissions.chars().all(|c| PERMISSION_CHARS.contains(c))
    {
        return None;
    }

    let (links, rest) = next_field(rest)?;
    if !is_digits(links) {
        return None;
    }
    let (owner, rest) = next_field(rest)?;
    let (group, rest) = next_field(rest)?;
    let (size, rest) = next_field(rest)?;
    if !is_digits(size) {
        return None;
    }
    let (month, rest) = next_field(rest)?;
    if !month.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let (day, rest) = next_field(rest)?;
    if !is_digits(day) {
        return None;
    }
    let (time, rest) = next_field(rest)?;
    if !time.chars().all(|c| c.is_ascii_digit() || c == ':') {
        return None;
    }

    let name = rest.trim_start();
    if name.is_empty() {
        return None;
    }

    let kind = permissions.chars().next()?;
    let mut entry = FileRecord {
        name: name.to_string(),
        is_dir: kind == 'd',
        is_symlink: kind == 'l',
        size: size.parse().unwrap_or(0),
        permissions: permissions.to_string(),
        owner: owner.to_string(),
        group: group.to_string(),
        mod_time: format!("{month} {day} {time}"),
        link_target: None,
    };

    if entry.is_symlink
        && let Some((link, target)) = name.split_once(" -> ")
    {
        entry.name = link.to_string();
        entry.link_target = Some(target.to_string());
    }

    Some(entry)
}

fn next_field(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    let end = input.find(char::is_whitespace)?;
    Some((&input[..end], &input[end..]))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return format!("/{name}");
    }
    format!("{base}/{name}")
}

pub fn parent_path(path: &str) -> String {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(index) if index > 0 => path[..index].to_string(),
        _ => "/".to_string(),
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BrowserState {
    Idle,
    Loading,
    Ready,
    Error,
    Viewing,
}

/// What opening the selected entry asks for.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FileOpen {
    Directory(String),
    File(String),
}

#[derive(Debug, Clone)]
pub struct FilePreview {
    pub path: String,
    pub content: String,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
pub struct FileBrowser {
    target: Option<ContainerTarget>,
    current_path: String,
    history: Vec<String>,
    entries: Vec<FileRecord>,
    skipped: usize,
    selected: usize,
    state: BrowserState,
    error: Option<String>,
    preview: Option<FilePreview>,
    viewport_height: usize,
}

impl Default for FileBrowser {
    fn default() -> Self {
        Self {
            target: None,
            current_path: "/".to_string(),
            history: Vec::new(),
            entries: Vec::new(),
            skipped: 0,
            selected: 0,
            state: BrowserState::Idle,
            error: None,
            preview: None,
            viewport_height: 10,
        }
    }
}

impl FileBrowser {
    /// Clears everything and points the browser at `/` of the given container.
    pub fn reset(&mut self, target: Option<ContainerTarget>) {
        let viewport_height = self.viewport_height;
        *self = Self {
            target,
            viewport_height,
            ..Self::default()
        };
    }

    pub fn target(&self) -> Option<&ContainerTarget> {
        self.target.as_ref()
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn entries(&self) -> &[FileRecord] {
        &self.entries
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&FileRecord> {
        self.entries.get(self.selected)
    }

    pub fn state(&self) -> BrowserState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn preview(&self) -> Option<&FilePreview> {
        self.preview.as_ref()
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
    }

    /// Moves to `path` and marks it loading; the caller issues the listing.
    pub fn navigate_to(&mut self, path: &str) {
        if path != self.current_path {
            self.history.push(self.current_path.clone());
        }
        self.current_path = path.to_string();
        self.begin_load();
    }

    pub fn begin_load(&mut self) {
        self.state = BrowserState::Loading;
        self.error = None;
        self.preview = None;
    }

    /// Applies a listing result. Results for any path but the current one are ignored.
    pub fn apply_listing(&mut self, path: &str, result: Result<ParsedListing, String>) -> bool {
        if path != self.current_path || self.state != BrowserState::Loading {
            return false;
        }

        match result {
            Ok(listing) => {
                self.entries = listing.entries;
                self.skipped = listing.skipped;
                self.selected = 0;
                self.error = None;
                self.state = BrowserState::Ready;
            }
            Err(error) => {
                self.entries.clear();
                self.skipped = 0;
                self.selected = 0;
                self.error = Some(error);
                self.state = BrowserState::Error;
            }
        }
        true
    }

    pub fn begin_preview(&mut self, path: &str) {
        self.preview = Some(FilePreview {
            path: path.to_string(),
            content: String::new(),
            scroll: 0,
        });
        self.error = None;
        self.state = BrowserState::Loading;
    }

    pub fn apply_preview(&mut self, path: &str, result: Result<String, String>) -> bool {
        let Some(preview) = self.preview.as_mut() else {
            return false;
        };
        if preview.path != path {
            return false;
        }

        match result {
            Ok(content) => {
                preview.content = content;
                preview.scroll = 0;
                self.state = BrowserState::Viewing;
            }
            Err(error) => {
                self.preview = None;
                self.error = Some(error);
                self.state = BrowserState::Error;
            }
        }
        true
    }

    pub fn close_preview(&mut self) -> bool {
        if self.preview.take().is_none() {
            return false;
        }
        self.state = if self.error.is_some() {
            BrowserState::Error
        } else {
            BrowserState::Ready
        };
        true
    }

    pub fn is_viewing(&self) -> bool {
        self.preview.is_some()
    }

    /// Resolves the selected entry into the next request, updating the path for directories.
    pub fn open_selected(&mut self) -> Option<FileOpen> {
        if self.state == BrowserState::Loading {
            return None;
        }
        let entry = self.selected_entry()?.clone();
        match entry.name.as_str() {
            "." => {
                self.begin_load();
                Some(FileOpen::Directory(self.current_path.clone()))
            }
            ".." => self.go_parent().map(FileOpen::Directory),
            name if entry.is_navigable() => {
                let path = join_path(&self.current_path, name);
                self.navigate_to(&path);
                Some(FileOpen::Directory(path))
            }
            name => {
                let path = join_path(&self.current_path, name);
                self.begin_preview(&path);
                Some(FileOpen::File(path))
            }
        }
    }

    /// Navigates to the parent directory; `None` when already at `/`.
    pub fn go_parent(&mut self) -> Option<String> {
        if self.current_path == "/" {
            return None;
        }
        let parent = parent_path(&self.current_path);
        self.navigate_to(&parent);
        Some(parent)
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            self.selected = 0;
            return;
        }
        let max_index = self.entries.len().saturating_sub(1) as isize;
        let current = self.selected.min(max_index as usize) as isize;
        self.selected = (current + delta).clamp(0, max_index) as usize;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.entries.len().saturating_sub(1);
    }

    pub fn page_size(&self) -> isize {
        self.viewport_height.max(1) as isize
    }

    pub fn scroll_preview(&mut self, delta: isize) {
        let height = self.viewport_height;
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        let max_scroll = preview.content.lines().count().saturating_sub(height);
        let next = (preview.scroll as isize + delta).clamp(0, max_scroll as isize);
        preview.scroll = next as usize;
    }

    pub fn preview_to_end(&mut self, end: bool) {
        let height = self.viewport_height;
        if let Some(preview) = self.preview.as_mut() {
            preview.scroll = if end {
                preview.content.lines().count().saturating_sub(height)
            } else {
                0
            };
        }
    }
}
