//! The single HTML page served at `/`. All rendering is done with
//! `textContent`, never by injecting model output as markup.

pub const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Paper Digest</title>
  <style>
    body { font-family: system-ui, sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
    fieldset { border: 1px solid #ccc; margin-bottom: 1rem; }
    label { display: block; margin: .4rem 0; }
    input[type=text], input[type=password], textarea { width: 100%; box-sizing: border-box; }
    textarea { min-height: 12rem; }
    button { margin-right: .5rem; }
    .error { color: #a00; white-space: pre-wrap; }
    .warning { color: #8a5a00; }
    .hidden { display: none; }
    pre { background: #f6f6f6; padding: .6rem; white-space: pre-wrap; max-height: 20rem; overflow: auto; }
    table { border-collapse: collapse; width: 100%; }
    th, td { border-bottom: 1px solid #ddd; text-align: left; padding: .3rem; vertical-align: top; }
  </style>
</head>
<body>
  <h1>Paper Digest</h1>
  <p>Turn an academic paper into a structured reading note.</p>

  <fieldset>
    <legend>API key</legend>
    <label>OpenAI API key (kept in this page only)
      <input id="api-key" type="password" autocomplete="off" placeholder="sk-...">
    </label>
  </fieldset>

  <fieldset>
    <legend>Paper</legend>
    <label><input type="radio" name="mode" value="url" checked> URL</label>
    <label><input type="radio" name="mode" value="raw_text"> Raw Text</label>
    <div id="url-input">
      <label>Paper URL (PDF or HTML)
        <input id="url" type="text" placeholder="https://arxiv.org/pdf/...">
      </label>
      <button id="fetch-btn" type="button">Fetch Content</button>
      <pre id="preview" class="hidden"></pre>
    </div>
    <div id="text-input" class="hidden">
      <label>Paper text
        <textarea id="text" placeholder="Paste the abstract or full text"></textarea>
      </label>
    </div>
  </fieldset>

  <button id="digest-btn" type="button">Generate Digest</button>
  <span id="status"></span>
  <p id="error" class="error"></p>

  <section id="result" class="hidden">
    <h2 id="digest-title"></h2>
    <dl id="digest-fields"></dl>
    <ul id="warnings"></ul>
    <p><a id="download" class="hidden" href="#">Download .docx</a></p>
  </section>

  <h2>Saved digests</h2>
  <table>
    <thead><tr><th>Date</th><th>Title</th><th>Field</th><th>Source</th></tr></thead>
    <tbody id="saved"></tbody>
  </table>
  <p id="saved-total"></p>

<script>
const $ = (id) => document.getElementById(id);
const SECTIONS = [
  ["field_or_topic", "Field or Topic"],
  ["research_question", "Research Question"],
  ["methodology", "Methodology"],
  ["key_findings", "Key Findings"],
  ["limitations", "Limitations"],
  ["personal_takeaway", "Personal Takeaway"],
];

function mode() {
  return document.querySelector("input[name=mode]:checked").value;
}

function setError(message) {
  $("error").textContent = message || "";
}

async function postJson(path, body) {
  const resp = await fetch(path, {
    method: "POST",
    headers: { "content-type": "application/json" },
    body: JSON.stringify(body),
  });
  const data = await resp.json().catch(() => null);
  if (!resp.ok) {
    const message = data && data.error ? data.error.message : `request failed (${resp.status})`;
    throw new Error(message);
  }
  return data;
}

for (const radio of document.querySelectorAll("input[name=mode]")) {
  radio.addEventListener("change", () => {
    $("url-input").classList.toggle("hidden", mode() !== "url");
    $("text-input").classList.toggle("hidden", mode() !== "raw_text");
  });
}

$("fetch-btn").addEventListener("click", async () => {
  setError("");
  $("status").textContent = "Fetching...";
  try {
    const data = await postJson("/api/fetch", { url: $("url").value });
    const pages = data.pages ? `, ${data.pages} pages` : "";
    $("preview").textContent = `[${data.kind}${pages}, ${data.chars} chars]\n\n${data.preview}`;
    $("preview").classList.remove("hidden");
  } catch (err) {
    setError(err.message);
  } finally {
    $("status").textContent = "";
  }
});

function renderDigest(data) {
  const digest = data.digest;
  $("digest-title").textContent = digest.title || "Untitled paper";
  const fields = $("digest-fields");
  fields.replaceChildren();
  for (const [key, label] of SECTIONS) {
    const dt = document.createElement("dt");
    const strong = document.createElement("strong");
    strong.textContent = label;
    dt.appendChild(strong);
    const dd = document.createElement("dd");
    if (key === "key_findings") {
      const ul = document.createElement("ul");
      for (const finding of digest.key_findings) {
        const li = document.createElement("li");
        li.textContent = finding;
        ul.appendChild(li);
      }
      dd.appendChild(ul);
    } else {
      dd.textContent = digest[key];
    }
    fields.append(dt, dd);
  }

  const warnings = $("warnings");
  warnings.replaceChildren();
  for (const warning of data.warnings) {
    const li = document.createElement("li");
    li.className = "warning";
    li.textContent = warning;
    warnings.appendChild(li);
  }

  const link = $("download");
  if (data.document) {
    link.href = data.document.download_url;
    link.textContent = `Download ${data.document.name}`;
    link.classList.remove("hidden");
  } else {
    link.classList.add("hidden");
  }
  $("result").classList.remove("hidden");
}

$("digest-btn").addEventListener("click", async () => {
  setError("");
  $("status").textContent = "Generating digest...";
  $("digest-btn").disabled = true;
  const body = { mode: mode() };
  const key = $("api-key").value.trim();
  if (key) body.api_key = key;
  if (body.mode === "url") body.url = $("url").value;
  else body.text = $("text").value;
  try {
    renderDigest(await postJson("/api/digest", body));
    await loadSaved();
  } catch (err) {
    setError(err.message);
  } finally {
    $("status").textContent = "";
    $("digest-btn").disabled = false;
  }
});

async function loadSaved() {
  const resp = await fetch("/api/digests");
  if (!resp.ok) return;
  const records = await resp.json();
  const body = $("saved");
  body.replaceChildren();
  for (const record of records) {
    const tr = document.createElement("tr");
    const cells = [
      new Date(record.timestamp).toLocaleString(),
      record.title || "(untitled)",
      record.field_or_topic,
      record.source_url || record.source_type,
    ];
    for (const value of cells) {
      const td = document.createElement("td");
      td.textContent = value;
      tr.appendChild(td);
    }
    body.appendChild(tr);
  }
  $("saved-total").textContent = `Total digests saved: ${records.length}`;
}

loadSaved();
</script>
</body>
</html>
"##;
