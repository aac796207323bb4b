use reddit_client::PUBLIC_BASE_URL;
use subrelay_core::Post;

pub const TITLE_WIDTH: usize = 64;
pub const EXCERPT_WIDTH: usize = 128;

const NO_POSTS_REPLIES: &[&str] = &[
    "No dice!",
    "Well, this is awkward.",
    "Nothing to see here.",
    "That didn't work out.",
    "Better luck next week.",
];

/// Word-boundary truncation with a `...` placeholder; the result never
/// exceeds `width` characters. Runs of whitespace collapse to single spaces.
pub fn shorten(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let full = words.join(" ");
    if full.chars().count() <= width {
        return full;
    }

    let mut out = String::new();
    let mut out_chars = 0;
    for word in words {
        let word_chars = word.chars().count();
        let needed = if out.is_empty() {
            word_chars
        } else {
            out_chars + 1 + word_chars
        };
        if needed + 3 > width {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
            out_chars += 1;
        }
        out.push_str(word);
        out_chars += word_chars;
    }

    out.push_str("...");
    out
}

pub fn post_url(post: &Post) -> String {
    format!("{}{}", PUBLIC_BASE_URL, post.permalink)
}

/// One relayed message per newly observed post.
pub fn new_post(post: &Post, subreddit: &str) -> String {
    let mut message = format!(
        "**{}**\n{}\n",
        shorten(&post.title, TITLE_WIDTH),
        post_url(post)
    );

    let excerpt = shorten(&post.body, EXCERPT_WIDTH);
    if !excerpt.is_empty() {
        message.push_str(&excerpt);
        message.push('\n');
    }

    message.push_str(&format!("Posted by u/{} in {}", post.author, subreddit));
    message
}

/// Digest body summarizing the top posts of a subreddit.
pub fn digest(subreddit: &str, posts: &[Post]) -> String {
    let mut digest = String::new();

    for post in posts {
        digest.push_str(&format!(
            "[**{}**]({})\n",
            shorten(&post.title, TITLE_WIDTH),
            post_url(post)
        ));

        let excerpt = shorten(&post.body, EXCERPT_WIDTH);
        if !excerpt.is_empty() {
            digest.push_str(&excerpt);
            digest.push('\n');
        }

        digest.push_str(&format!(
            "| {} upvotes | {} comments | u/{} | {} |\n\n",
            post.upvotes, post.comment_count, post.author, subreddit
        ));
    }

    digest
}

/// Clearly labeled "not found" reply for a subreddit that yielded no posts.
pub fn no_posts_notice(subreddit: &str) -> String {
    let title = NO_POSTS_REPLIES[fastrand::usize(..NO_POSTS_REPLIES.len())];
    format!(
        "**{}**\nSorry! We couldn't find any posts from {}. \
         If this problem persists, please let us know.",
        title, subreddit
    )
}
