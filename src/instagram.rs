//! Blocking Instagram web client: login, profile lookup, paginated timeline and comment threads.
//! Cookies are tracked by hand so the whole set can be persisted through a `SessionStore`.

use crate::date::from_epoch;
use crate::model::{Comment, CommentThread, Post, Profile};
use crate::session::{SessionClient, SessionData};
use crate::source::{FeedSource, PostStream, ThreadStream};
use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{COOKIE, REFERER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use time::OffsetDateTime;

const BASE: &str = "https://www.instagram.com";
const LOGIN_URL: &str = "https://www.instagram.com/api/v1/web/accounts/login/ajax/";
const PROFILE_URL: &str = "https://i.instagram.com/api/v1/users/web_profile_info/";
const GRAPHQL_URL: &str = "https://www.instagram.com/graphql/query/";
const APP_ID: &str = "936619743392459";

const TIMELINE_QUERY: &str = "003056d32c2554def87228bc3fd9668a";
const COMMENTS_QUERY: &str = "97b41c52301f77ce508f55e66d17620e";
const REPLIES_QUERY: &str = "863813fb3a9d7af3ec2ceb8b3af77b7e";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

// ---------------------------------- wire shapes ----------------------------------

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Edges<T> {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Default, Deserialize)]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl PageInfo {
    fn next_cursor(&self) -> Option<String> {
        if self.has_next_page { self.end_cursor.clone().filter(|c| !c.is_empty()) } else { None }
    }
}

#[derive(Deserialize)]
struct Count {
    #[serde(default)]
    count: u64,
}

#[derive(Deserialize)]
struct ProfileData {
    user: Option<ProfileUser>,
}

#[derive(Deserialize)]
struct ProfileUser {
    id: String,
    username: String,
    edge_owner_to_timeline_media: Option<Count>,
}

#[derive(Deserialize)]
struct TimelineData {
    user: Option<TimelineUser>,
}

#[derive(Deserialize)]
struct TimelineUser {
    edge_owner_to_timeline_media: Edges<MediaNode>,
}

#[derive(Deserialize)]
struct TextNode {
    text: String,
}

#[derive(Deserialize)]
struct MediaNode {
    shortcode: String,
    taken_at_timestamp: i64,
    edge_media_to_caption: Option<Edges<TextNode>>,
    edge_media_preview_like: Option<Count>,
    edge_liked_by: Option<Count>,
    edge_media_to_comment: Option<Count>,
}

impl MediaNode {
    fn into_post(self) -> Result<Post> {
        let caption = self
            .edge_media_to_caption
            .and_then(|e| e.edges.into_iter().next())
            .map(|e| e.node.text);
        let likes = self.edge_media_preview_like.or(self.edge_liked_by).map(|c| c.count).unwrap_or(0);
        Ok(Post {
            taken_at: from_epoch(self.taken_at_timestamp)?,
            shortcode: self.shortcode,
            caption,
            likes,
            comments: self.edge_media_to_comment.map(|c| c.count).unwrap_or(0),
        })
    }
}

#[derive(Deserialize)]
struct OwnerNode {
    username: Option<String>,
}

#[derive(Deserialize)]
struct CommentNode {
    id: String,
    #[serde(default)]
    text: String,
    created_at: i64,
    owner: Option<OwnerNode>,
    edge_liked_by: Option<Count>,
    edge_threaded_comments: Option<Edges<CommentNode>>,
}

impl CommentNode {
    fn to_comment(&self) -> Result<Comment> {
        Ok(Comment {
            owner: self.owner.as_ref().and_then(|o| o.username.clone()),
            text: self.text.clone(),
            likes: self.edge_liked_by.as_ref().map(|c| c.count).unwrap_or(0),
            created_at: from_epoch(self.created_at)?,
        })
    }
}

#[derive(Deserialize)]
struct CommentsData {
    shortcode_media: Option<CommentsMedia>,
}

#[derive(Deserialize)]
struct CommentsMedia {
    edge_media_to_parent_comment: Edges<CommentNode>,
}

#[derive(Deserialize)]
struct RepliesData {
    comment: Option<RepliesOwner>,
}

#[derive(Deserialize)]
struct RepliesOwner {
    edge_threaded_comments: Edges<CommentNode>,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    user: bool,
    #[serde(default)]
    two_factor_required: bool,
    checkpoint_url: Option<String>,
    message: Option<String>,
}

// ---------------------------------- client ----------------------------------

pub struct InstagramClient {
    http: Client,
    username: Mutex<Option<String>>,
    cookies: Mutex<BTreeMap<String, String>>,
    page_size: u32,
}

impl InstagramClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { http, username: Mutex::new(None), cookies: Mutex::new(BTreeMap::new()), page_size: 12 })
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.page_size = n.clamp(1, 50);
        self
    }

    pub fn session(&self) -> SessionData {
        SessionData {
            username: self.username.lock().clone().unwrap_or_default(),
            cookies: self.cookies.lock().clone(),
        }
    }

    fn cookie_header(&self) -> String {
        self.cookies.lock().iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("; ")
    }

    fn csrf(&self) -> String {
        self.cookies.lock().get("csrftoken").cloned().unwrap_or_default()
    }

    fn absorb_cookies(&self, resp: &Response) {
        let mut jar = self.cookies.lock();
        for c in resp.cookies() {
            if c.value().is_empty() || c.value() == "\"\"" {
                jar.remove(c.name());
            } else {
                jar.insert(c.name().to_string(), c.value().to_string());
            }
        }
    }

    fn decorate(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(COOKIE, self.cookie_header())
            .header("X-IG-App-ID", APP_ID)
            .header("X-CSRFToken", self.csrf())
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER, format!("{BASE}/"))
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = self.decorate(req).send().with_context(|| format!("request {what}"))?;
        self.absorb_cookies(&resp);
        check_status(resp.status(), what)?;
        Ok(resp)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)], what: &str) -> Result<T> {
        let resp = self.send(self.http.get(url).query(query), what)?;
        resp.json::<T>().with_context(|| format!("{what}: unexpected response shape"))
    }

    fn graphql<T: DeserializeOwned>(&self, query_hash: &str, variables: serde_json::Value, what: &str) -> Result<T> {
        let env: Envelope<T> = self.get_json(
            GRAPHQL_URL,
            &[("query_hash", query_hash.to_string()), ("variables", variables.to_string())],
            what,
        )?;
        Ok(env.data)
    }

    fn timeline_page(&self, user_id: &str, after: Option<&str>) -> Result<Edges<MediaNode>> {
        let vars = json!({ "id": user_id, "first": self.page_size, "after": after });
        let data: TimelineData = self.graphql(TIMELINE_QUERY, vars, "timeline page")?;
        data.user
            .map(|u| u.edge_owner_to_timeline_media)
            .ok_or_else(|| anyhow!("timeline page: user {user_id} not found"))
    }

    fn comment_page(&self, shortcode: &str, after: Option<&str>) -> Result<Edges<CommentNode>> {
        let vars = json!({ "shortcode": shortcode, "first": 50, "after": after });
        let data: CommentsData = self.graphql(COMMENTS_QUERY, vars, "comment page")?;
        data.shortcode_media
            .map(|m| m.edge_media_to_parent_comment)
            .ok_or_else(|| anyhow!("comment page: post {shortcode} not found"))
    }

    fn reply_page(&self, comment_id: &str, after: Option<&str>) -> Result<Edges<CommentNode>> {
        let vars = json!({ "comment_id": comment_id, "first": 50, "after": after });
        let data: RepliesData = self.graphql(REPLIES_QUERY, vars, "reply page")?;
        data.comment
            .map(|c| c.edge_threaded_comments)
            .ok_or_else(|| anyhow!("reply page: comment {comment_id} not found"))
    }

    /// One top-level comment with every reply: the embedded ones, then any further pages.
    fn thread_of(&self, mut node: CommentNode) -> Result<CommentThread> {
        let comment = node.to_comment()?;
        let replies = match node.edge_threaded_comments.take() {
            None => Vec::new(),
            Some(first) => {
                let id = node.id.as_str();
                Paged::seeded(first, |after: Option<&str>| self.reply_page(id, after))
                    .map(|r| r.and_then(|n| n.to_comment()))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        Ok(CommentThread { comment, replies })
    }
}

impl SessionClient for InstagramClient {
    fn restore(&mut self, session: SessionData) {
        *self.username.lock() = Some(session.username);
        *self.cookies.lock() = session.cookies;
    }

    fn login(&mut self, username: &str, password: &str) -> Result<SessionData> {
        // Landing page hands out the csrftoken cookie.
        self.send(self.http.get(format!("{BASE}/")), "landing page")?;

        let ts = OffsetDateTime::now_utc().unix_timestamp();
        let form = [
            ("username", username.to_string()),
            ("enc_password", format!("#PWD_INSTAGRAM_BROWSER:0:{ts}:{password}")),
            ("queryParams", "{}".to_string()),
            ("optIntoOneTap", "false".to_string()),
        ];
        let resp = self.send(self.http.post(LOGIN_URL).form(&form), "login")?;
        let body: LoginResponse = resp.json().context("login: unexpected response shape")?;
        check_login(body, username)?;
        *self.username.lock() = Some(username.to_string());
        Ok(self.session())
    }
}

impl FeedSource for InstagramClient {
    fn profile(&self, username: &str) -> Result<Profile> {
        let env: Envelope<ProfileData> =
            self.get_json(PROFILE_URL, &[("username", username.to_string())], "profile lookup")?;
        let user = env.data.user.ok_or_else(|| anyhow!("profile {username} does not exist"))?;
        Ok(Profile {
            id: user.id,
            username: user.username,
            media_count: user.edge_owner_to_timeline_media.map(|c| c.count).unwrap_or(0),
        })
    }

    fn posts<'a>(&'a self, profile: &Profile) -> Result<PostStream<'a>> {
        let user_id = profile.id.clone();
        let pages = Paged::new(move |after: Option<&str>| self.timeline_page(&user_id, after));
        Ok(Box::new(pages.map(|r| r.and_then(MediaNode::into_post))))
    }

    fn comments<'a>(&'a self, post: &Post) -> Result<ThreadStream<'a>> {
        let shortcode = post.shortcode.clone();
        tracing::debug!(shortcode=%shortcode, "fetching comments");
        let pages = Paged::new(move |after: Option<&str>| self.comment_page(&shortcode, after));
        Ok(Box::new(pages.map(move |r| r.and_then(|node| self.thread_of(node)))))
    }
}

/// Status mapping shared by every request.
fn check_status(status: StatusCode, what: &str) -> Result<()> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => bail!("{what}: rate limited by upstream (429)"),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            bail!("{what}: not authorized ({status}), session may have expired")
        }
        s if s.is_client_error() || s.is_server_error() => bail!("{what}: bad status {s}"),
        _ => Ok(()),
    }
}

fn check_login(body: LoginResponse, username: &str) -> Result<()> {
    if body.two_factor_required {
        bail!("login: two-factor authentication required for {username}");
    }
    if let Some(url) = body.checkpoint_url {
        bail!("login: checkpoint required ({url})");
    }
    if !body.user {
        bail!("login: user {username} does not exist");
    }
    if !body.authenticated {
        bail!("login: wrong password for {username}{}", body.message.map(|m| format!(" ({m})")).unwrap_or_default());
    }
    Ok(())
}

/// Lazy walk over cursor-paged edges. Each page is requested only once the previous one
/// is used up; a failed page is yielded once and ends the stream.
struct Paged<T, F> {
    fetch: F,
    cursor: Option<String>,
    buf: VecDeque<T>,
    exhausted: bool,
}

impl<T, F> Paged<T, F>
where
    F: FnMut(Option<&str>) -> Result<Edges<T>>,
{
    fn new(fetch: F) -> Self {
        Self { fetch, cursor: None, buf: VecDeque::new(), exhausted: false }
    }

    /// Start from a page that arrived embedded in a parent response.
    fn seeded(first: Edges<T>, fetch: F) -> Self {
        let mut paged = Self::new(fetch);
        paged.absorb(first);
        paged
    }

    fn absorb(&mut self, page: Edges<T>) {
        self.cursor = page.page_info.next_cursor();
        // an empty page never advances, so it also ends the walk
        self.exhausted = self.cursor.is_none() || page.edges.is_empty();
        self.buf.extend(page.edges.into_iter().map(|e| e.node));
    }
}

impl<T, F> Iterator for Paged<T, F>
where
    F: FnMut(Option<&str>) -> Result<Edges<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.buf.pop_front() {
                return Some(Ok(node));
            }
            if self.exhausted {
                return None;
            }
            match (self.fetch)(self.cursor.as_deref()) {
                Ok(page) => {
                    tracing::debug!(count = ?page.count, got = page.edges.len(), "page");
                    self.absorb(page);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
