use crate::context::RequestContext;

const USER_AGENT_PREFIX_LEN: usize = 20;
const ORIGIN_PREFIX_LEN: usize = 20;

/// Key the rate limiter buckets a request under.
///
/// The resolved client address when there is one; otherwise a weak fingerprint
/// made of the first characters of the user agent and origin, reduced to
/// `[A-Za-z0-9-]`. The fingerprint only separates anonymous clients, it does not
/// resist spoofing.
pub fn client_id(ctx: &RequestContext) -> String {
    if ctx.has_client_ip() {
        return ctx.client_ip.clone();
    }

    let user_agent: String = ctx.user_agent.chars().take(USER_AGENT_PREFIX_LEN).collect();
    let origin: String = ctx.origin.chars().take(ORIGIN_PREFIX_LEN).collect();

    format!("{user_agent}-{origin}")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}
