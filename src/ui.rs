use crate::clock;
use crate::models::{Parameters, Profile, ProfileIcon, TodayResponse};
use std::fmt::Write;

pub fn render_index(today: &TodayResponse, profiles: &[&Profile], params: &Parameters) -> String {
    INDEX_HTML
        .replace("{{DATE}}", &today.date)
        .replace("{{TOTAL}}", &today.cumulative_intake.to_string())
        .replace("{{GOAL}}", &today.goal.to_string())
        .replace("{{PERCENT}}", &today.percent.to_string())
        .replace("{{QUICK_ADD}}", &quick_add_buttons(profiles))
        .replace("{{HISTORY}}", &history_items(today))
        .replace("{{PROFILES}}", &profile_rows(profiles))
        .replace("{{REMINDERS}}", &reminder_rows(params))
        .replace("{{ICONS}}", &icon_options())
}

fn quick_add_buttons(profiles: &[&Profile]) -> String {
    let mut out = String::new();
    for profile in profiles {
        let _ = write!(
            out,
            r#"<button class="quick" type="button" data-profile="{}"><span class="icon">{}</span>{} <small>{} ml</small></button>"#,
            profile.id,
            profile.icon.emoji(),
            escape_html(&profile.label),
            profile.amount
        );
    }
    out
}

fn history_items(today: &TodayResponse) -> String {
    if today.history.is_empty() {
        return r#"<li class="empty">Nothing yet today.</li>"#.to_string();
    }
    let mut out = String::new();
    for entry in &today.history {
        let _ = write!(
            out,
            r#"<li><span class="icon">{}</span>{}<span class="amount">{} ml</span><span class="time">{}</span></li>"#,
            entry.icon,
            escape_html(&entry.label),
            entry.amount,
            entry.time
        );
    }
    out
}

fn profile_rows(profiles: &[&Profile]) -> String {
    let mut out = String::new();
    for profile in profiles {
        let _ = write!(
            out,
            r#"<li>{} {} <small>{} ml</small><button class="remove" type="button" data-delete-profile="{}" aria-label="Delete">×</button></li>"#,
            profile.icon.emoji(),
            escape_html(&profile.label),
            profile.amount,
            profile.id
        );
    }
    out
}

fn reminder_rows(params: &Parameters) -> String {
    if params.reminders.is_empty() {
        return r#"<li class="empty">No reminders.</li>"#.to_string();
    }
    let mut out = String::new();
    for rule in &params.reminders {
        let _ = write!(
            out,
            r#"<li>{} ml before {}<button class="remove" type="button" data-delete-reminder="{}" aria-label="Delete">×</button></li>"#,
            rule.threshold_amount,
            clock::format_minutes(rule.deadline_minutes_since_midnight),
            rule.id
        );
    }
    out
}

fn icon_options() -> String {
    let mut out = String::new();
    for icon in ProfileIcon::ALL {
        let _ = write!(out, r#"<option value="{}">{}</option>"#, icon.tag(), icon.emoji());
    }
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Water Tracker</title>
  <style>
    :root {
      --bg-1: #eaf6ff;
      --bg-2: #b9e3ff;
      --ink: #1d2b36;
      --accent: #0077cc;
      --accent-2: #00aaff;
      --card: rgba(255, 255, 255, 0.88);
      --shadow: 0 24px 60px rgba(0, 70, 120, 0.16);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(160deg, var(--bg-1), #f4fbff 70%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 24px 16px 48px;
    }

    .app {
      width: min(900px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 32px;
      display: grid;
      grid-template-columns: minmax(220px, 320px) 1fr;
      gap: 28px;
    }

    header {
      grid-column: 1 / -1;
    }

    h1 {
      margin: 0;
      font-size: clamp(1.8rem, 4vw, 2.4rem);
    }

    h2 {
      margin: 0 0 10px;
      font-size: 1.1rem;
    }

    .subtitle {
      margin: 4px 0 0;
      color: #5b6b77;
    }

    #gauge {
      width: 100%;
      aspect-ratio: 2 / 3;
      touch-action: none;
      user-select: none;
      border-radius: 22px;
      overflow: hidden;
      cursor: grab;
    }

    #gauge img {
      width: 100%;
      height: 100%;
      display: block;
      pointer-events: none;
    }

    .side {
      display: grid;
      gap: 22px;
      align-content: start;
    }

    .quick-bar {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 16px;
      font-size: 0.95rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    button:active {
      transform: scale(0.97);
    }

    button.secondary {
      background: rgba(0, 119, 204, 0.1);
      color: var(--accent);
    }

    button.remove {
      background: transparent;
      color: #b0413e;
      padding: 0 8px;
      margin-left: auto;
    }

    .quick .icon {
      margin-right: 6px;
    }

    form {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
      align-items: center;
    }

    input,
    select {
      border: 1px solid rgba(0, 70, 120, 0.2);
      border-radius: 12px;
      padding: 8px 10px;
      font-size: 0.95rem;
      width: 8em;
    }

    ul {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 6px;
    }

    li {
      display: flex;
      gap: 8px;
      align-items: center;
      background: white;
      border-radius: 12px;
      padding: 8px 12px;
    }

    li.empty {
      color: #8a97a1;
    }

    li .amount {
      margin-left: auto;
      font-weight: 600;
    }

    li .time {
      color: #8a97a1;
      font-size: 0.85rem;
    }

    .stats {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(120px, 1fr));
      gap: 10px;
    }

    .stat {
      background: white;
      border-radius: 14px;
      padding: 12px;
    }

    .stat .label {
      display: block;
      font-size: 0.75rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: #8a97a1;
    }

    .stat .value {
      font-size: 1.3rem;
      font-weight: 600;
      color: var(--accent);
    }

    #chart {
      width: 100%;
      height: 160px;
      display: block;
      background: white;
      border-radius: 14px;
    }

    .bar {
      fill: var(--accent-2);
    }

    .bar.met {
      fill: var(--accent);
    }

    .chart-label {
      fill: #7a8791;
      font-size: 11px;
    }

    .toast {
      position: fixed;
      left: 50%;
      bottom: 24px;
      transform: translate(-50%, 120%);
      opacity: 0;
      transition: transform 200ms ease, opacity 200ms ease;
      background: var(--ink);
      color: white;
      border-radius: 999px;
      padding: 10px 20px;
    }

    .toast.show {
      transform: translate(-50%, 0);
      opacity: 1;
    }

    .toast[data-kind="updated"] {
      background: #2d7a4b;
    }

    .banner {
      display: none;
      background: #fff4d6;
      border-radius: 14px;
      padding: 12px 16px;
    }

    .banner.show {
      display: block;
    }

    @media (max-width: 680px) {
      .app {
        grid-template-columns: 1fr;
        padding: 22px;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Water Tracker</h1>
      <p class="subtitle"><span id="date">{{DATE}}</span> · <span id="total">{{TOTAL}}</span> / <span id="goal">{{GOAL}}</span> ml (<span id="percent">{{PERCENT}}</span>%)</p>
    </header>

    <div id="gauge" aria-label="Water level">
      <img id="gauge-frame" src="/gauge.svg" alt="" />
    </div>

    <div class="side">
      <div class="banner" id="reminder"></div>

      <section>
        <h2>Drink</h2>
        <div class="quick-bar" id="quick-bar">{{QUICK_ADD}}</div>
        <form id="custom-form">
          <input name="amount" inputmode="numeric" placeholder="ml" />
          <button type="submit">Add</button>
          <button class="secondary" type="button" id="undo">Undo</button>
          <button class="secondary" type="button" id="undo-all">Undo all</button>
        </form>
      </section>

      <section>
        <h2>Today</h2>
        <ul id="history">{{HISTORY}}</ul>
      </section>

      <section>
        <h2>Statistics</h2>
        <div class="stats">
          <div class="stat"><span class="label">Total</span><span class="value" id="stat-total">--</span></div>
          <div class="stat"><span class="label">Debt</span><span class="value" id="stat-debt">--</span></div>
          <div class="stat"><span class="label">Streak</span><span class="value" id="stat-streak">--</span></div>
          <div class="stat"><span class="label">Best</span><span class="value" id="stat-best">--</span></div>
        </div>
        <svg id="chart" viewBox="0 0 600 160" role="img" aria-label="Last 7 days"></svg>
      </section>

      <section>
        <h2>Settings</h2>
        <form id="goal-form">
          <label>Goal <input name="goal" inputmode="numeric" value="{{GOAL}}" /></label>
          <button type="submit">Save</button>
        </form>
      </section>

      <section>
        <h2>Glasses</h2>
        <ul id="profiles">{{PROFILES}}</ul>
        <form id="profile-form">
          <select name="icon">{{ICONS}}</select>
          <input name="label" placeholder="Name" />
          <input name="amount" inputmode="numeric" placeholder="ml" />
          <button type="submit">Add</button>
        </form>
      </section>

      <section>
        <h2>Reminders</h2>
        <ul id="reminders">{{REMINDERS}}</ul>
        <form id="reminder-form">
          <input name="amount" inputmode="numeric" placeholder="ml" />
          <input name="time" type="time" />
          <button type="submit">Add</button>
        </form>
      </section>
    </div>
  </main>

  <div class="toast" id="toast"></div>

  <script>
    const $ = (id) => document.getElementById(id);
    const gaugeEl = $('gauge');
    const frameEl = $('gauge-frame');
    const toastEl = $('toast');
    const reminderEl = $('reminder');
    let toastTimer = null;
    let activeNotification = null;

    const showToast = (toast) => {
      toastEl.textContent = toast.message;
      toastEl.dataset.kind = toast.kind;
      toastEl.classList.add('show');
      clearTimeout(toastTimer);
      toastTimer = setTimeout(() => toastEl.classList.remove('show'), 1800);
    };

    const api = async (method, url, body) => {
      const res = await fetch(url, {
        method,
        headers: body ? { 'content-type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined
      });
      const text = await res.text();
      const data = text ? (() => { try { return JSON.parse(text); } catch (_) { return { message: text }; } })() : {};
      if (!res.ok) {
        showToast({ kind: data.kind || 'invalidNumber', message: data.message || 'Request failed' });
        throw new Error(data.message || 'Request failed');
      }
      return data;
    };

    const renderToday = (today) => {
      $('date').textContent = today.date;
      $('total').textContent = today.cumulative_intake;
      $('goal').textContent = today.goal;
      $('percent').textContent = today.percent;
      $('history').innerHTML = today.history.length
        ? today.history.map((e) => `<li><span class="icon">${e.icon}</span>${escape(e.label)}<span class="amount">${e.amount} ml</span><span class="time">${e.time}</span></li>`).join('')
        : '<li class="empty">Nothing yet today.</li>';
    };

    const escape = (text) => String(text).replace(/[&<>"]/g, (c) => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;' })[c]);

    const renderChart = (days) => {
      const chart = $('chart');
      const max = Math.max(1, ...days.map((d) => d.consumed));
      const slot = 600 / days.length;
      chart.innerHTML = days.map((d, i) => {
        const h = (d.consumed / max) * 120;
        const x = i * slot + slot * 0.2;
        return `<rect class="bar${d.goal_met ? ' met' : ''}" x="${x}" y="${130 - h}" width="${slot * 0.6}" height="${h}" rx="6" />`
          + `<text class="chart-label" x="${x + slot * 0.3}" y="150" text-anchor="middle">${d.date.slice(5)}</text>`;
      }).join('');
    };

    const loadStats = async () => {
      const stats = await api('GET', '/api/stats');
      $('stat-total').textContent = `${stats.total_consumed} ml`;
      $('stat-debt').textContent = `${stats.accumulated_debt} ml`;
      $('stat-streak').textContent = stats.current_streak;
      $('stat-best').textContent = stats.best_streak;
      renderChart(stats.last_7_days);
    };

    const afterIntake = (today) => {
      renderToday(today);
      loadStats().catch(() => {});
      checkReminders().catch(() => {});
    };

    const afterSettings = () => window.location.reload();

    const checkReminders = async () => {
      const check = await api('POST', '/api/reminders/evaluate');
      if (activeNotification && check.closed.includes(activeNotification.id)) {
        activeNotification.close && activeNotification.close();
        activeNotification = null;
      }
      const n = check.notification;
      reminderEl.classList.toggle('show', Boolean(n));
      reminderEl.textContent = n ? `${n.icon} ${n.body}` : '';
      if (n && (!activeNotification || activeNotification.id !== n.id)) {
        activeNotification = { id: n.id };
        if ('Notification' in window && Notification.permission === 'granted') {
          const shown = new Notification(n.title, { body: n.body, tag: n.category });
          activeNotification.close = () => shown.close();
        }
      }
    };

    // Each animation frame steps the server-side engine by the measured frame time.
    let frameInFlight = false;
    let lastFrameAt = null;
    let frameUrl = null;
    const pullFrame = (now) => {
      if (!frameInFlight && !document.hidden) {
        frameInFlight = true;
        const deltaMs = lastFrameAt === null ? 0 : now - lastFrameAt;
        lastFrameAt = now;
        fetch('/api/gauge/frame', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify({ deltaMs })
        })
          .then((res) => (res.ok ? res.blob() : Promise.reject(res.status)))
          .then((svg) => {
            if (frameUrl) URL.revokeObjectURL(frameUrl);
            frameUrl = URL.createObjectURL(svg);
            frameEl.src = frameUrl;
          })
          .catch(() => {})
          .finally(() => { frameInFlight = false; });
      } else if (document.hidden) {
        lastFrameAt = null;
      }
      requestAnimationFrame(pullFrame);
    };

    const sendViewport = () => {
      const rect = gaugeEl.getBoundingClientRect();
      api('POST', '/api/gauge/viewport', { width: rect.width, height: rect.height, dpr: window.devicePixelRatio || 1 }).catch(() => {});
    };

    const gesture = (phase, event) => {
      const rect = gaugeEl.getBoundingClientRect();
      api('POST', '/api/gauge/gesture', { phase, x: event.clientX - rect.left, y: event.clientY - rect.top }).catch(() => {});
    };

    let dragging = false;
    gaugeEl.addEventListener('pointerdown', (e) => { dragging = true; gaugeEl.setPointerCapture(e.pointerId); gesture('start', e); });
    gaugeEl.addEventListener('pointermove', (e) => { if (dragging) gesture('move', e); });
    const endDrag = (e) => { if (dragging) { dragging = false; gesture('end', e); } };
    gaugeEl.addEventListener('pointerup', endDrag);
    gaugeEl.addEventListener('pointercancel', endDrag);

    $('quick-bar').addEventListener('click', (e) => {
      const button = e.target.closest('[data-profile]');
      if (button) {
        api('POST', '/api/intake', { profileId: Number(button.dataset.profile) }).then(afterIntake).catch(() => {});
      }
    });

    $('custom-form').addEventListener('submit', (e) => {
      e.preventDefault();
      const amount = e.target.amount.value;
      api('POST', '/api/intake', { amount }).then((today) => { e.target.reset(); afterIntake(today); }).catch(() => {});
    });

    $('undo').addEventListener('click', () => api('POST', '/api/undo').then(afterIntake).catch(() => {}));
    $('undo-all').addEventListener('click', () => api('POST', '/api/undo-all').then(afterIntake).catch(() => {}));

    $('goal-form').addEventListener('submit', (e) => {
      e.preventDefault();
      api('POST', '/api/goal', { goal: e.target.goal.value })
        .then((res) => { showToast(res.toast); setTimeout(afterSettings, 600); }).catch(() => {});
    });

    $('profile-form').addEventListener('submit', (e) => {
      e.preventDefault();
      const f = e.target;
      api('POST', '/api/profiles', { label: f.label.value, icon: f.icon.value, amount: f.amount.value })
        .then((res) => { showToast(res.toast); setTimeout(afterSettings, 600); }).catch(() => {});
    });

    $('reminder-form').addEventListener('submit', (e) => {
      e.preventDefault();
      const f = e.target;
      api('POST', '/api/reminders', { amount: f.amount.value, time: f.time.value })
        .then((res) => { showToast(res.toast); setTimeout(afterSettings, 600); }).catch(() => {});
    });

    document.addEventListener('click', (e) => {
      const profile = e.target.closest('[data-delete-profile]');
      const reminder = e.target.closest('[data-delete-reminder]');
      const target = profile
        ? `/api/profiles/${profile.dataset.deleteProfile}`
        : reminder ? `/api/reminders/${reminder.dataset.deleteReminder}` : null;
      if (target) {
        api('DELETE', target).then((res) => { showToast(res.toast); setTimeout(afterSettings, 600); }).catch(() => {});
      }
    });

    window.addEventListener('resize', sendViewport);
    window.addEventListener('focus', () => checkReminders().catch(() => {}));
    if ('Notification' in window && Notification.permission === 'default') {
      Notification.requestPermission().catch(() => {});
    }

    sendViewport();
    requestAnimationFrame(pullFrame);
    loadStats().catch(() => {});
    checkReminders().catch(() => {});
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryEntry, ProfileId};

    fn today(history: Vec<HistoryEntry>) -> TodayResponse {
        TodayResponse {
            date: "2026-08-03".to_string(),
            cumulative_intake: 550,
            goal: 2000,
            percent: 27,
            history,
        }
    }

    #[test]
    fn fills_every_placeholder() {
        let params = Parameters::default();
        let profiles: Vec<&Profile> = params.profiles.iter().collect();
        let html = render_index(&today(Vec::new()), &profiles, &params);

        assert!(!html.contains("{{"));
        assert!(html.contains(r#"<span id="total">550</span>"#));
        assert!(html.contains(r#"data-profile="4""#));
        assert!(html.contains("1500 ml before 15h30"));
        assert!(html.contains("Nothing yet today."));
        assert!(html.contains("/api/gauge/frame"));
    }

    #[test]
    fn escapes_user_labels() {
        let mut params = Parameters::default();
        params.profiles = vec![Profile {
            id: ProfileId(1),
            icon: ProfileIcon::Generic,
            label: "<b>Mug</b>".to_string(),
            amount: 350,
            use_count: 0,
        }];
        let profiles: Vec<&Profile> = params.profiles.iter().collect();
        let entry = HistoryEntry {
            icon: ProfileIcon::Generic.emoji().to_string(),
            label: "<b>Mug</b>".to_string(),
            amount: 350,
            time: "8h15".to_string(),
        };
        let html = render_index(&today(vec![entry]), &profiles, &params);

        assert!(!html.contains("<b>Mug</b>"));
        assert!(html.contains("&lt;b&gt;Mug&lt;/b&gt;"));
        assert!(html.contains("8h15"));
    }
}
